#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "class_workspace_it_{}_{}_{}",
        std::process::id(),
        nanos,
        name
    ))
}

pub fn write_file(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

pub fn jar_bytes(entries: &[(&str, &[u8])]) -> anyhow::Result<Vec<u8>> {
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Minimal class file: `public class <name> extends java/lang/Object`, no
/// members, class file version 61. `pad_to` grows the constant pool until the
/// file has that length.
pub fn class_bytes(name: &str, pad_to: Option<usize>) -> Vec<u8> {
    let unpadded = assemble(name, None);
    match pad_to {
        Some(target) if target >= unpadded.len() + 3 => {
            assemble(name, Some(target - unpadded.len() - 3))
        }
        _ => unpadded,
    }
}

fn assemble(name: &str, padding: Option<usize>) -> Vec<u8> {
    use ristretto_classfile::{ClassAccessFlags, ClassFile, ConstantPool, JAVA_17};

    let mut constant_pool = ConstantPool::default();
    let this_class = constant_pool.add_class(name).unwrap();
    let super_class = constant_pool.add_class("java/lang/Object").unwrap();
    if let Some(n) = padding {
        constant_pool.add_utf8("x".repeat(n).as_str()).unwrap();
    }

    let class_file = ClassFile {
        version: JAVA_17,
        constant_pool,
        access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        this_class,
        super_class,
        ..Default::default()
    };
    let mut bytes = Vec::new();
    class_file.to_bytes(&mut bytes).unwrap();
    bytes
}
