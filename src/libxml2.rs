//! LibXML2 FFI Wrapper Module
//!
//! This module provides a safe wrapper around libxml2's streaming text reader
//! (`xmlTextReader`), used to read model declarations out of an XTF header
//! fragment once the bounded scan in [`crate::header`] has isolated it.
//!
//! The reader walks the fragment node by node, so the whole fragment must be
//! well-formed for a read to succeed, but no DOM is ever built. Only opaque
//! pointers cross the FFI boundary; attribute values and names are borrowed
//! from the reader and copied into owned Rust strings before the next read.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Once;

use libc::{c_char, c_int, c_uchar};

use crate::error::{LibXml2Error, LibXml2Result};

/// Global initialization flag for libxml2
///
/// libxml2's initialization functions are NOT thread-safe, so they are run
/// exactly once behind `std::sync::Once`.
static LIBXML2_INIT: Once = Once::new();

/// Suppress error reports on stderr
const XML_PARSE_NOERROR: c_int = 1 << 5;
/// Suppress warning reports on stderr
const XML_PARSE_NOWARNING: c_int = 1 << 6;
/// Forbid network access while parsing
const XML_PARSE_NONET: c_int = 1 << 11;

const XML_READER_TYPE_ELEMENT: c_int = 1;
const XML_READER_TYPE_END_ELEMENT: c_int = 15;

/// Opaque libxml2 reader structure
#[repr(C)]
pub struct XmlTextReader {
    _private: [u8; 0],
}

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();

    pub fn xmlReaderForMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlTextReader;
    pub fn xmlFreeTextReader(reader: *mut XmlTextReader);

    pub fn xmlTextReaderRead(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderNodeType(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderDepth(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderIsEmptyElement(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderConstLocalName(reader: *mut XmlTextReader) -> *const c_uchar;

    pub fn xmlTextReaderMoveToAttribute(reader: *mut XmlTextReader, name: *const c_uchar)
    -> c_int;
    pub fn xmlTextReaderMoveToElement(reader: *mut XmlTextReader) -> c_int;
    pub fn xmlTextReaderConstValue(reader: *mut XmlTextReader) -> *const c_uchar;
}

/// Copy a libxml2-owned string into an owned Rust string
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of this call.
unsafe fn copy_xml_string(ptr: *const c_uchar) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let c_str = unsafe { CStr::from_ptr(ptr as *const c_char) };
    Some(c_str.to_string_lossy().into_owned())
}

/// Owned `xmlTextReader` over a borrowed in-memory buffer
///
/// The reader does not copy its input, so the buffer is tied to the reader's
/// lifetime. The reader is freed on drop, on every exit path.
struct TextReader<'a> {
    ptr: NonNull<XmlTextReader>,
    _input: PhantomData<&'a [u8]>,
}

impl<'a> TextReader<'a> {
    fn from_memory(data: &'a [u8]) -> LibXml2Result<Self> {
        let size = c_int::try_from(data.len()).map_err(|_| LibXml2Error::InputTooLarge {
            size: data.len(),
        })?;

        let ptr = unsafe {
            xmlReaderForMemory(
                data.as_ptr() as *const c_char,
                size,
                std::ptr::null(),
                c"UTF-8".as_ptr(),
                XML_PARSE_NOERROR | XML_PARSE_NOWARNING | XML_PARSE_NONET,
            )
        };

        NonNull::new(ptr)
            .map(|ptr| TextReader {
                ptr,
                _input: PhantomData,
            })
            .ok_or(LibXml2Error::ReaderCreationFailed)
    }

    /// Advance to the next node; `Ok(false)` at end of input
    fn read(&mut self) -> LibXml2Result<bool> {
        match unsafe { xmlTextReaderRead(self.ptr.as_ptr()) } {
            1 => Ok(true),
            0 => Ok(false),
            code => Err(LibXml2Error::MalformedXml { code }),
        }
    }

    fn node_type(&self) -> c_int {
        unsafe { xmlTextReaderNodeType(self.ptr.as_ptr()) }
    }

    fn depth(&self) -> c_int {
        unsafe { xmlTextReaderDepth(self.ptr.as_ptr()) }
    }

    fn is_empty_element(&self) -> bool {
        unsafe { xmlTextReaderIsEmptyElement(self.ptr.as_ptr()) == 1 }
    }

    fn local_name(&self) -> Option<String> {
        unsafe { copy_xml_string(xmlTextReaderConstLocalName(self.ptr.as_ptr())) }
    }

    /// Value of attribute `name` on the current element
    fn attribute(&mut self, name: &CStr) -> Option<String> {
        unsafe {
            let reader = self.ptr.as_ptr();
            if xmlTextReaderMoveToAttribute(reader, name.as_ptr() as *const c_uchar) != 1 {
                return None;
            }
            let value = copy_xml_string(xmlTextReaderConstValue(reader));
            xmlTextReaderMoveToElement(reader);
            value
        }
    }
}

impl Drop for TextReader<'_> {
    fn drop(&mut self) {
        unsafe { xmlFreeTextReader(self.ptr.as_ptr()) }
    }
}

/// Safe access to the parts of libxml2 the header extractor needs
#[derive(Debug)]
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Create a new wrapper, initializing libxml2 on first use
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Read `attribute` from every immediate child of the first `list_element`
    /// found directly under the root of `fragment`.
    ///
    /// Children without the attribute are skipped. The whole fragment is read,
    /// so a fragment that is not well-formed yields
    /// [`LibXml2Error::MalformedXml`] even if the list itself was intact.
    pub fn child_attribute_values(
        &self,
        fragment: &[u8],
        list_element: &str,
        attribute: &str,
    ) -> LibXml2Result<Vec<String>> {
        let attribute = CString::new(attribute).map_err(|_| LibXml2Error::InvalidName {
            name: attribute.to_string(),
        })?;

        let mut reader = TextReader::from_memory(fragment)?;
        let mut values = Vec::new();
        let mut list_seen = false;
        let mut in_list = false;

        while reader.read()? {
            match (reader.node_type(), reader.depth()) {
                (XML_READER_TYPE_ELEMENT, 1) => {
                    let is_list = reader.local_name().as_deref() == Some(list_element);
                    in_list = is_list && !list_seen && !reader.is_empty_element();
                    list_seen |= is_list;
                }
                (XML_READER_TYPE_END_ELEMENT, 1) => in_list = false,
                (XML_READER_TYPE_ELEMENT, 2) if in_list => {
                    if let Some(value) = reader.attribute(&attribute) {
                        values.push(value);
                    }
                }
                _ => {}
            }
        }

        Ok(values)
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
