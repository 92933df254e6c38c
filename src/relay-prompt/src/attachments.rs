//! Attached-file injection.
//!
//! Attachments are classified by extension: text-like files are read and
//! appended to the prompt as delimited blocks, binary files are only listed
//! by name since their content cannot be transmitted in a prompt. All reads
//! are best-effort.

use std::path::PathBuf;

/// Extensions treated as binary and never read into the prompt.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "ico", "svgz", "pdf", "zip", "gz", "tar", "bz2",
    "xz", "7z", "rar", "exe", "dll", "so", "dylib", "bin", "o", "a", "class", "jar", "war", "mp3",
    "mp4", "m4a", "avi", "mov", "mkv", "wav", "ogg", "flac", "woff", "woff2", "ttf", "otf", "eot",
    "db", "sqlite", "wasm",
];

/// One attached file by name and on-disk location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Display name, usually the original file name.
    pub name: String,

    /// Where the attachment content lives.
    pub path: PathBuf,
}

impl Attachment {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Classify an attachment name by extension.
pub fn is_binary_name(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| BINARY_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Render one text attachment as a delimited block. Null bytes are stripped
/// from the content before injection.
pub fn render_attachment_block(name: &str, content: &str) -> String {
    let content = content.replace('\0', "");
    format!("--- Attached file: {name} ---\n{content}\n--- End of {name} ---")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classification() {
        assert!(is_binary_name("photo.PNG"));
        assert!(is_binary_name("archive.tar"));
        assert!(!is_binary_name("notes.md"));
        assert!(!is_binary_name("Makefile"));
    }

    #[test]
    fn test_block_strips_null_bytes() {
        let block = render_attachment_block("a.txt", "he\0llo");
        assert_eq!(
            block,
            "--- Attached file: a.txt ---\nhello\n--- End of a.txt ---"
        );
    }
}
