//! Archive relocation: applies a ruleset to every entry of a JAR/ZIP
//! container, producing a byte-identical output for byte-identical inputs.

use std::io::{Cursor, Read, Seek, Write};

use hitch_util::errors::{HitchError, HitchResult};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::classfile;
use crate::rule::{rules_are_noop, RelocationRule};
use crate::text::{rewrite_slash, rewrite_slash_and_dot};

/// Relocate `input` into `output`, applying `rules`. A no-op ruleset copies
/// the archive through unchanged, still normalized to deterministic
/// ordering and timestamps so repeated runs over the same input are
/// byte-identical.
pub fn relocate<R: Read + Seek, W: Write + Seek>(
    input: R,
    output: W,
    rules: &[RelocationRule],
) -> HitchResult<()> {
    let mut archive = ZipArchive::new(input).map_err(|e| HitchError::ConfigurationError {
        message: format!("not a valid archive: {e}"),
    })?;

    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).map(|f| f.name().to_string()))
        .collect::<Result<_, _>>()
        .map_err(|e| HitchError::ConfigurationError {
            message: format!("failed reading archive entry: {e}"),
        })?;
    names.sort();

    let mut writer = ZipWriter::new(output);
    let noop = rules_are_noop(rules);

    for name in names {
        if is_signature_file(&name) {
            tracing::debug!(entry = %name, "stripping signature file");
            continue;
        }

        let mut entry = archive
            .by_name(&name)
            .map_err(|e| HitchError::ConfigurationError {
                message: format!("missing entry {name}: {e}"),
            })?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        drop(entry);

        let (out_name, out_data) = if noop {
            (name, data)
        } else {
            relocate_entry(&name, data, rules)?
        };

        let options: FileOptions<()> = FileOptions::default();
        writer
            .start_file(out_name, options)
            .map_err(|e| HitchError::ConfigurationError {
                message: format!("failed writing archive entry: {e}"),
            })?;
        writer.write_all(&out_data)?;
    }

    writer.finish().map_err(|e| HitchError::ConfigurationError {
        message: format!("failed finalizing archive: {e}"),
    })?;
    Ok(())
}

/// Convenience entry point operating on in-memory buffers.
pub fn relocate_bytes(input: &[u8], rules: &[RelocationRule]) -> HitchResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    relocate(Cursor::new(input), &mut out, rules)?;
    Ok(out.into_inner())
}

fn is_signature_file(name: &str) -> bool {
    let Some(stripped) = name.strip_prefix("META-INF/") else {
        return false;
    };
    stripped.ends_with(".SF") || stripped.ends_with(".DSA") || stripped.ends_with(".RSA")
}

fn relocate_entry(
    name: &str,
    data: Vec<u8>,
    rules: &[RelocationRule],
) -> HitchResult<(String, Vec<u8>)> {
    if let Some(service_name) = name.strip_prefix("META-INF/services/") {
        let (new_service_name, _) = rewrite_slash_and_dot(service_name, rules);
        let out_name = format!("META-INF/services/{new_service_name}");
        let content = String::from_utf8_lossy(&data);
        let (new_content, _) = rewrite_slash_and_dot(&content, rules);
        return Ok((out_name, new_content.into_bytes()));
    }

    if name == "META-INF/MANIFEST.MF" {
        let content = String::from_utf8_lossy(&data);
        let (new_content, _) = rewrite_slash_and_dot(&content, rules);
        return Ok((name.to_string(), new_content.into_bytes()));
    }

    if name.ends_with(".class") && classfile::is_class_file(&data) {
        let (new_data, _) = classfile::rewrite_class(&data, rules)?;
        let (new_name, _) = rewrite_slash(name, rules);
        return Ok((new_name, new_data));
    }

    // Other textual resources: best-effort rewrite, binary data passes
    // through untouched.
    match std::str::from_utf8(&data) {
        Ok(text) => {
            let (new_text, _) = rewrite_slash_and_dot(text, rules);
            Ok((name.to_string(), new_text.into_bytes()))
        }
        Err(_) => Ok((name.to_string(), data)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use zip::write::FileOptions;

    fn build_test_jar() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut buf);
            let options: FileOptions<()> = FileOptions::default();
            writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
            writer
                .write_all(b"Manifest-Version: 1.0\nMain-Class: com.foo.Main\n")
                .unwrap();
            writer.start_file("README.txt", options).unwrap();
            writer.write_all(b"see com.foo for details").unwrap();
            writer
                .start_file("META-INF/example.SF", options)
                .unwrap();
            writer.write_all(b"signature").unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn noop_ruleset_preserves_entries() {
        let jar = build_test_jar();
        let out = relocate_bytes(&jar, &[]).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(out)).unwrap();
        assert!(archive.by_name("META-INF/MANIFEST.MF").is_ok());
    }

    #[test]
    fn strips_signature_files() {
        let jar = build_test_jar();
        let rules = vec![RelocationRule::new("com/foo", "shaded/foo")];
        let out = relocate_bytes(&jar, &rules).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(out)).unwrap();
        assert!(archive.by_name("META-INF/example.SF").is_err());
    }

    #[test]
    fn rewrites_manifest_main_class() {
        let jar = build_test_jar();
        let rules = vec![RelocationRule::new("com/foo", "shaded/foo")];
        let out = relocate_bytes(&jar, &rules).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(out)).unwrap();
        let mut manifest = archive.by_name("META-INF/MANIFEST.MF").unwrap();
        let mut content = String::new();
        manifest.read_to_string(&mut content).unwrap();
        assert!(content.contains("Main-Class: shaded.foo.Main"));
    }

    #[test]
    fn rewrites_textual_resources() {
        let jar = build_test_jar();
        let rules = vec![RelocationRule::new("com/foo", "shaded/foo")];
        let out = relocate_bytes(&jar, &rules).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(out)).unwrap();
        let mut readme = archive.by_name("README.txt").unwrap();
        let mut content = String::new();
        readme.read_to_string(&mut content).unwrap();
        assert!(content.contains("shaded.foo"));
    }

    #[test]
    fn entries_are_emitted_in_sorted_order() {
        let jar = build_test_jar();
        let out1 = relocate_bytes(&jar, &[]).unwrap();
        let out2 = relocate_bytes(&jar, &[]).unwrap();
        assert_eq!(out1, out2);
    }
}
