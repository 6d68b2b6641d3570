//! Class file headers and class stream splitting.
//!
//! Parsing is delegated to `ristretto_classfile`; this module keeps only what
//! naming a class needs and tracks how many bytes each class occupied, so a
//! stream of concatenated classes can be cut back into its parts.

use std::io::Cursor;

use ristretto_classfile::ClassFile;
use serde::Serialize;
use thiserror::Error;

pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;
const MAGIC_BYTES: [u8; 4] = CLASS_MAGIC.to_be_bytes();

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFormatError {
    #[error("class data is empty")]
    Empty,
    #[error("bad magic 0x{0:08X}")]
    BadMagic(u32),
    #[error("malformed class at offset {offset}: {message}")]
    Malformed { offset: usize, message: String },
    #[error("class name is empty")]
    EmptyName,
}

impl ClassFormatError {
    fn malformed(offset: usize, err: impl std::fmt::Debug) -> Self {
        ClassFormatError::Malformed {
            offset,
            message: format!("{err:?}"),
        }
    }

    fn shifted(self, base: usize) -> Self {
        match self {
            ClassFormatError::Malformed { offset, message } => ClassFormatError::Malformed {
                offset: offset + base,
                message,
            },
            other => other,
        }
    }
}

/// Header facts of one parsed class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    pub internal_name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub access_flags: u16,
    pub minor_version: u16,
    pub major_version: u16,
    /// Number of bytes the class structure occupies.
    pub len: usize,
}

impl ClassInfo {
    fn from_class_file(class: &ClassFile, len: usize) -> Result<Self, ClassFormatError> {
        let pool = &class.constant_pool;
        let class_name = |index: u16| {
            pool.try_get_class(index)
                .map(|name| name.to_string())
                .map_err(|e| ClassFormatError::malformed(0, e))
        };

        let internal_name = class_name(class.this_class)?;
        if internal_name.is_empty() {
            return Err(ClassFormatError::EmptyName);
        }
        let super_name = match class.super_class {
            0 => None,
            index => Some(class_name(index)?),
        };
        let interfaces = class
            .interfaces
            .iter()
            .map(|&index| class_name(index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ClassInfo {
            internal_name,
            super_name,
            interfaces,
            access_flags: class.access_flags.bits(),
            minor_version: class.version.minor(),
            major_version: class.version.major(),
            len,
        })
    }
}

/// One class found in a class stream.
#[derive(Debug, Clone)]
pub struct ClassSegment<'a> {
    pub info: ClassInfo,
    pub bytes: &'a [u8],
}

pub fn starts_with_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC_BYTES)
}

/// Parses a single class from the start of `bytes`.
///
/// Trailing bytes after the class structure are not inspected; `len` on the
/// result tells where the class ends.
pub fn parse_class(bytes: &[u8]) -> Result<ClassInfo, ClassFormatError> {
    if bytes.is_empty() {
        return Err(ClassFormatError::Empty);
    }
    let magic = bytes
        .get(..4)
        .and_then(|head| <[u8; 4]>::try_from(head).ok())
        .map(u32::from_be_bytes)
        .ok_or_else(|| ClassFormatError::Malformed {
            offset: 0,
            message: "truncated magic".to_string(),
        })?;
    if magic != CLASS_MAGIC {
        return Err(ClassFormatError::BadMagic(magic));
    }

    let mut cursor = Cursor::new(bytes.to_vec());
    let class = ClassFile::from_bytes(&mut cursor).map_err(|e| ClassFormatError::malformed(0, e))?;
    let len = usize::try_from(cursor.position()).unwrap_or(bytes.len());
    ClassInfo::from_class_file(&class, len)
}

/// Splits a class stream (one class file, or several concatenated) into its
/// classes.
///
/// Bytes after the last class that do not begin another class stay attached
/// to the last segment, so a lone class always maps back to its full input.
pub fn split_classes(bytes: &[u8]) -> Result<Vec<ClassSegment<'_>>, ClassFormatError> {
    let mut bounds: Vec<(ClassInfo, usize, usize)> = Vec::new();
    let mut offset = 0usize;

    loop {
        let rest = bytes.get(offset..).unwrap_or_default();
        let info = parse_class(rest).map_err(|e| e.shifted(offset))?;
        let end = offset + info.len;
        bounds.push((info, offset, end));
        offset = end;

        let rest = bytes.get(offset..).unwrap_or_default();
        if rest.is_empty() {
            break;
        }
        if !starts_with_magic(rest) {
            if let Some(last) = bounds.last_mut() {
                tracing::warn!(
                    "{} trailing bytes after class {}",
                    rest.len(),
                    last.0.internal_name
                );
                last.2 = bytes.len();
            }
            break;
        }
    }

    Ok(bounds
        .into_iter()
        .map(|(info, start, end)| ClassSegment {
            info,
            bytes: bytes.get(start..end).unwrap_or_default(),
        })
        .collect())
}


#[cfg(test)]
mod tests {
    use super::fixtures::ClassBuilder;
    use super::*;

    #[test]
    fn parse_minimal_class() {
        let bytes = ClassBuilder::new("com/example/Foo")
            .interface("java/io/Serializable")
            .build();
        let info = parse_class(&bytes).unwrap();
        assert_eq!(info.internal_name, "com/example/Foo");
        assert_eq!(info.super_name.as_deref(), Some("java/lang/Object"));
        assert_eq!(info.interfaces, vec!["java/io/Serializable"]);
        assert_eq!(info.major_version, 52);
        assert_eq!(info.access_flags, 0x0021);
        assert_eq!(info.len, bytes.len());
    }

    #[test]
    fn long_constants_take_two_slots() {
        let bytes = ClassBuilder::new("a/B").with_long_constant().build();
        assert_eq!(parse_class(&bytes).unwrap().internal_name, "a/B");
    }

    #[test]
    fn builder_pads_to_exact_length() {
        let bytes = ClassBuilder::new("com/example/Foo").pad_to(200).build();
        assert_eq!(bytes.len(), 200);
        assert_eq!(parse_class(&bytes).unwrap().len, 200);
    }

    #[test]
    fn missing_super_is_none() {
        let bytes = ClassBuilder::new("module-info").no_super().build();
        assert_eq!(parse_class(&bytes).unwrap().super_name, None);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(parse_class(&[]), Err(ClassFormatError::Empty));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let err = parse_class(b"PK\x03\x04rest").unwrap_err();
        assert_eq!(err, ClassFormatError::BadMagic(0x504B_0304));
    }

    #[test]
    fn every_truncation_is_an_error_not_a_panic() {
        let bytes = ClassBuilder::new("com/example/Foo").build();
        for cut in 1..bytes.len() {
            let err = parse_class(&bytes[..cut]).unwrap_err();
            assert!(
                matches!(err, ClassFormatError::Malformed { offset: 0, .. }),
                "cut at {cut}: {err:?}"
            );
        }
    }

    #[test]
    fn illegal_constant_tag_is_malformed() {
        let mut bytes = ClassBuilder::new("a/B").build();
        // first constant tag sits right after magic, versions and count
        bytes[10] = 2;
        assert!(matches!(
            parse_class(&bytes).unwrap_err(),
            ClassFormatError::Malformed { .. }
        ));
    }

    #[test]
    fn this_class_pointing_at_utf8_is_rejected() {
        let mut bytes = ClassBuilder::new("a/B").build();
        // access_flags, this_class, super_class, then four empty counts
        let this_pos = bytes.len() - 12;
        bytes[this_pos..this_pos + 2].copy_from_slice(&1u16.to_be_bytes());
        assert!(matches!(
            parse_class(&bytes).unwrap_err(),
            ClassFormatError::Malformed { .. }
        ));
    }

    #[test]
    fn split_concatenated_classes() {
        let a = ClassBuilder::new("p/A").build();
        let b = ClassBuilder::new("p/A$1").build();
        let mut stream = a.clone();
        stream.extend_from_slice(&b);

        let segments = split_classes(&stream).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].info.internal_name, "p/A");
        assert_eq!(segments[0].bytes, &a[..]);
        assert_eq!(segments[1].info.internal_name, "p/A$1");
        assert_eq!(segments[1].bytes, &b[..]);
    }

    #[test]
    fn trailing_bytes_stay_with_last_class() {
        let mut bytes = ClassBuilder::new("p/A").build();
        bytes.extend_from_slice(b"\0\0junk");
        let segments = split_classes(&bytes).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].bytes, &bytes[..]);
    }

    #[test]
    fn malformed_second_class_reports_its_start() {
        let a = ClassBuilder::new("p/A").build();
        let mut stream = a.clone();
        stream.extend_from_slice(&CLASS_MAGIC.to_be_bytes());
        match split_classes(&stream).unwrap_err() {
            ClassFormatError::Malformed { offset, .. } => assert_eq!(offset, a.len()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_ascii_names_decode() {
        let bytes = ClassBuilder::new("p/Caf\u{e9}").build();
        assert_eq!(parse_class(&bytes).unwrap().internal_name, "p/Caf\u{e9}");
    }
}
