//! Built-in file metadata providers.
//!
//! These are ordinary [`FieldProvider`] implementations registered by the
//! CLI; library users may replace or extend them with their own.

use camino::Utf8Path;

use crate::error::{MtlError, Result};
use crate::fields::{FieldProvider, HelpEntry};

/// Fields derived from the file's path.
///
/// Claims the `filepath` field and its dotted sub-attributes:
/// `filepath.name`, `filepath.stem`, `filepath.suffix`, `filepath.parent`.
pub struct FilePathProvider;

const FILEPATH_FIELDS: &[(&str, &str)] = &[
    ("{filepath}", "Full path to the file"),
    ("{filepath.name}", "File name, including any extension"),
    ("{filepath.stem}", "File name without its extension"),
    ("{filepath.suffix}", "File extension with leading dot, empty if none"),
    ("{filepath.parent}", "Parent directory of the file"),
];

impl FieldProvider for FilePathProvider {
    fn resolve(
        &self,
        filepath: &Utf8Path,
        field: &str,
        _subfield: Option<&str>,
        _field_arg: Option<&str>,
        _default: &[String],
    ) -> Result<Option<Vec<Option<String>>>> {
        let (base, attribute) = match field.split_once('.') {
            Some((base, attribute)) => (base, Some(attribute)),
            None => (field, None),
        };
        if base != "filepath" {
            return Ok(None);
        }

        let value = match attribute {
            None => filepath.as_str().to_string(),
            Some("name") => filepath.file_name().unwrap_or_default().to_string(),
            Some("stem") => filepath.file_stem().unwrap_or_default().to_string(),
            Some("suffix") => filepath
                .extension()
                .map(|ext| format!(".{ext}"))
                .unwrap_or_default(),
            Some("parent") => filepath
                .parent()
                .map(|parent| parent.to_string())
                .unwrap_or_default(),
            Some(other) => {
                return Err(MtlError::Syntax(format!(
                    "unknown filepath attribute: {other}"
                )));
            }
        };
        Ok(Some(vec![Some(value)]))
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![
            HelpEntry::Markdown("**File Path Fields**".to_string()),
            field_table(FILEPATH_FIELDS),
        ]
    }
}

/// Fields read from the file's stat metadata.
pub struct FileStatProvider;

#[cfg(unix)]
const FILESTAT_FIELDS: &[(&str, &str)] = &[
    ("{size}", "Size of file in bytes"),
    ("{uid}", "User identifier of the file owner"),
    ("{gid}", "Group identifier of the file owner"),
    ("{user}", "User name of the file owner"),
    ("{group}", "Group name of the file owner"),
];

#[cfg(not(unix))]
const FILESTAT_FIELDS: &[(&str, &str)] = &[("{size}", "Size of file in bytes")];

impl FieldProvider for FileStatProvider {
    fn resolve(
        &self,
        filepath: &Utf8Path,
        field: &str,
        _subfield: Option<&str>,
        _field_arg: Option<&str>,
        _default: &[String],
    ) -> Result<Option<Vec<Option<String>>>> {
        if !FILESTAT_FIELDS.iter().any(|(name, _)| *name == format!("{{{field}}}")) {
            return Ok(None);
        }

        let metadata = std::fs::metadata(filepath.as_std_path())?;
        #[cfg(unix)]
        use std::os::unix::fs::MetadataExt;
        let value = match field {
            "size" => metadata.len().to_string(),
            #[cfg(unix)]
            "uid" => metadata.uid().to_string(),
            #[cfg(unix)]
            "gid" => metadata.gid().to_string(),
            #[cfg(unix)]
            "user" => match users::get_user_by_uid(metadata.uid()) {
                Some(user) => user.name().to_string_lossy().into_owned(),
                // Claimed with no value; the default machinery takes over.
                None => return Ok(Some(vec![None])),
            },
            #[cfg(unix)]
            "group" => match users::get_group_by_gid(metadata.gid()) {
                Some(group) => group.name().to_string_lossy().into_owned(),
                None => return Ok(Some(vec![None])),
            },
            _ => return Ok(None),
        };
        Ok(Some(vec![Some(value)]))
    }

    fn help(&self) -> Vec<HelpEntry> {
        vec![
            HelpEntry::Markdown("**File Information Fields**".to_string()),
            field_table(FILESTAT_FIELDS),
        ]
    }
}

fn field_table(fields: &[(&str, &str)]) -> HelpEntry {
    let mut rows = vec![vec!["Field".to_string(), "Description".to_string()]];
    rows.extend(
        fields
            .iter()
            .map(|(name, description)| vec![name.to_string(), description.to_string()]),
    );
    HelpEntry::Table(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filepath_fields() {
        let provider = FilePathProvider;
        let path = Utf8Path::new("/tmp/photos/pears.jpg");
        let get = |field: &str| {
            provider
                .resolve(path, field, None, None, &[])
                .unwrap()
                .map(|v| v.into_iter().flatten().collect::<Vec<_>>())
        };

        assert_eq!(get("filepath"), Some(vec!["/tmp/photos/pears.jpg".to_string()]));
        assert_eq!(get("filepath.name"), Some(vec!["pears.jpg".to_string()]));
        assert_eq!(get("filepath.stem"), Some(vec!["pears".to_string()]));
        assert_eq!(get("filepath.suffix"), Some(vec![".jpg".to_string()]));
        assert_eq!(get("filepath.parent"), Some(vec!["/tmp/photos".to_string()]));
        assert_eq!(get("size"), None);
        assert_eq!(get("filename"), None);
    }

    #[test]
    fn test_filepath_unknown_attribute() {
        let provider = FilePathProvider;
        let path = Utf8Path::new("/tmp/pears.jpg");
        assert!(matches!(
            provider.resolve(path, "filepath.nope", None, None, &[]),
            Err(MtlError::Syntax(_))
        ));
    }

    #[test]
    fn test_filepath_no_extension() {
        let provider = FilePathProvider;
        let path = Utf8Path::new("/tmp/README");
        let resolved = provider
            .resolve(path, "filepath.suffix", None, None, &[])
            .unwrap();
        assert_eq!(resolved, Some(vec![Some(String::new())]));
    }

    #[test]
    fn test_filestat_size() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"0123456789").unwrap();
        drop(file);

        let utf8_path = Utf8Path::new(path.to_str().unwrap());
        let provider = FileStatProvider;
        let resolved = provider
            .resolve(utf8_path, "size", None, None, &[])
            .unwrap();
        assert_eq!(resolved, Some(vec![Some("10".to_string())]));
        assert_eq!(provider.resolve(utf8_path, "nosuch", None, None, &[]).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_filestat_uid_gid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owned");
        std::fs::write(&path, "x").unwrap();

        let utf8_path = Utf8Path::new(path.to_str().unwrap());
        let provider = FileStatProvider;
        for field in ["uid", "gid"] {
            let resolved = provider
                .resolve(utf8_path, field, None, None, &[])
                .unwrap()
                .unwrap();
            assert_eq!(resolved.len(), 1);
            let value = resolved[0].as_ref().unwrap();
            assert!(value.parse::<u32>().is_ok(), "{field} should be numeric: {value}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_filestat_user_and_group_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owned");
        std::fs::write(&path, "x").unwrap();

        let utf8_path = Utf8Path::new(path.to_str().unwrap());
        let provider = FileStatProvider;
        for field in ["user", "group"] {
            let resolved = provider
                .resolve(utf8_path, field, None, None, &[])
                .unwrap()
                .unwrap();
            assert_eq!(resolved.len(), 1);
            if let Some(name) = &resolved[0] {
                assert!(!name.is_empty(), "{field} name should not be empty");
            }
        }
    }

    #[test]
    fn test_filestat_missing_file_is_io_error() {
        let provider = FileStatProvider;
        let path = Utf8Path::new("/definitely/not/a/real/file");
        assert!(matches!(
            provider.resolve(path, "size", None, None, &[]),
            Err(MtlError::Io(_))
        ));
    }
}
