/// File classification into `Category/sub-folder` pairs.
///
/// Classification is layered: the extension table is authoritative, and a
/// content-type oracle is only consulted for files the table does not know.
/// A table hit is never overridden by content inference.
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// Sub-folder used for files whose name carries no extension.
pub const NO_EXTENSION_DIR: &str = "no_ext";

/// Sub-folder used when an extension exists but cannot be used as a folder name.
pub const UNKNOWN_EXTENSION_DIR: &str = "unknown";

/// How many leading bytes `ContentSniffer` reads from a file.
const SNIFF_LEN: u64 = 8192;

/// Characters that are not allowed in a folder name on common filesystems.
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Top-level bucket a file is sorted into.
///
/// The set is closed and exhaustive: `Others` catches everything the other
/// labels do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    /// Image files (JPG, PNG, SVG, etc.)
    Images,
    /// Video files (MP4, MKV, WEBM, etc.)
    Videos,
    /// Audio files (MP3, FLAC, WAV, etc.)
    Audio,
    /// Document files (PDF, DOCX, TXT, etc.)
    Documents,
    /// Archive files (ZIP, TAR, 7Z, etc.)
    Archives,
    /// Source code and markup files
    Code,
    /// Everything else
    Others,
}

impl Category {
    /// Every category, in folder-listing order.
    ///
    /// This is the one list of folder names: classification names folders
    /// from it and traversal uses it to recognise already organized files.
    pub const ALL: [Category; 7] = [
        Category::Images,
        Category::Videos,
        Category::Audio,
        Category::Documents,
        Category::Archives,
        Category::Code,
        Category::Others,
    ];

    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use sortdir::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "Images");
    /// assert_eq!(Category::Others.dir_name(), "Others");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Images => "Images",
            Category::Videos => "Videos",
            Category::Audio => "Audio",
            Category::Documents => "Documents",
            Category::Archives => "Archives",
            Category::Code => "Code",
            Category::Others => "Others",
        }
    }

    /// Looks up a category by its exact directory name.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.dir_name() == name)
    }

    /// Maps a coarse content type such as `image/png` to a category.
    ///
    /// Media types match by prefix; archive and document types must match
    /// one of a small fixed set exactly. Anything else is `Others`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sortdir::file_category::Category;
    ///
    /// assert_eq!(Category::from_content_type("video/mp4"), Category::Videos);
    /// assert_eq!(Category::from_content_type("application/zip"), Category::Archives);
    /// assert_eq!(Category::from_content_type("application/x-whatever"), Category::Others);
    /// ```
    pub fn from_content_type(content_type: &str) -> Self {
        let content_type = content_type.trim().to_ascii_lowercase();

        if content_type.starts_with("image/") {
            Category::Images
        } else if content_type.starts_with("video/") {
            Category::Videos
        } else if content_type.starts_with("audio/") {
            Category::Audio
        } else if ARCHIVE_CONTENT_TYPES.contains(&content_type.as_str()) {
            Category::Archives
        } else if DOCUMENT_CONTENT_TYPES.contains(&content_type.as_str()) {
            Category::Documents
        } else {
            Category::Others
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

const ARCHIVE_CONTENT_TYPES: &[&str] = &[
    "application/zip",
    "application/x-tar",
    "application/gzip",
    "application/x-bzip2",
    "application/x-xz",
    "application/x-7z-compressed",
    "application/vnd.rar",
    "application/x-rar-compressed",
];

const DOCUMENT_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "text/plain",
    "text/html",
    "application/msword",
    "application/rtf",
];

/// Built-in extension mappings, grouped by category.
const STANDARD_EXTENSIONS: &[(&str, Category)] = &[
    // Images
    ("jpg", Category::Images),
    ("jpeg", Category::Images),
    ("png", Category::Images),
    ("gif", Category::Images),
    ("bmp", Category::Images),
    ("webp", Category::Images),
    ("tif", Category::Images),
    ("tiff", Category::Images),
    ("svg", Category::Images),
    ("ico", Category::Images),
    // Videos
    ("mp4", Category::Videos),
    ("mkv", Category::Videos),
    ("mov", Category::Videos),
    ("avi", Category::Videos),
    ("wmv", Category::Videos),
    ("flv", Category::Videos),
    ("webm", Category::Videos),
    // Audio
    ("mp3", Category::Audio),
    ("wav", Category::Audio),
    ("flac", Category::Audio),
    ("aac", Category::Audio),
    ("ogg", Category::Audio),
    ("m4a", Category::Audio),
    // Documents
    ("pdf", Category::Documents),
    ("doc", Category::Documents),
    ("docx", Category::Documents),
    ("xls", Category::Documents),
    ("xlsx", Category::Documents),
    ("ppt", Category::Documents),
    ("pptx", Category::Documents),
    ("txt", Category::Documents),
    ("md", Category::Documents),
    ("rtf", Category::Documents),
    ("odt", Category::Documents),
    // Archives
    ("zip", Category::Archives),
    ("tar", Category::Archives),
    ("gz", Category::Archives),
    ("bz2", Category::Archives),
    ("7z", Category::Archives),
    ("rar", Category::Archives),
    // Code
    ("py", Category::Code),
    ("js", Category::Code),
    ("ts", Category::Code),
    ("java", Category::Code),
    ("c", Category::Code),
    ("cpp", Category::Code),
    ("cs", Category::Code),
    ("go", Category::Code),
    ("rb", Category::Code),
    ("rs", Category::Code),
    ("php", Category::Code),
    ("html", Category::Code),
    ("css", Category::Code),
    ("json", Category::Code),
    ("xml", Category::Code),
    ("sh", Category::Code),
    ("ps1", Category::Code),
];

/// Immutable lookup from lower-case extension (no leading dot) to category.
///
/// The table is assembled once, from the built-in mappings plus any
/// configured extras, and is only read afterwards.
#[derive(Debug, Clone)]
pub struct ExtensionTable {
    extension_map: HashMap<String, Category>,
}

impl ExtensionTable {
    /// Creates a table holding only the built-in mappings.
    pub fn standard() -> Self {
        Self::with_mappings(std::iter::empty::<(String, Category)>())
    }

    /// Creates a table from the built-in mappings plus `extra`.
    ///
    /// Extra mappings win over built-in ones with the same key. Keys are
    /// lower-cased and a leading dot is dropped, so `".HEIC"` and `"heic"`
    /// name the same entry.
    pub fn with_mappings<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = (S, Category)>,
        S: AsRef<str>,
    {
        let mut extension_map: HashMap<String, Category> = STANDARD_EXTENSIONS
            .iter()
            .map(|(ext, category)| (ext.to_string(), *category))
            .collect();

        for (ext, category) in extra {
            let key = normalize_extension(ext.as_ref());
            if !key.is_empty() {
                extension_map.insert(key, category);
            }
        }

        Self { extension_map }
    }

    /// Maps an extension to a category, ignoring case.
    ///
    /// # Examples
    ///
    /// ```
    /// use sortdir::file_category::{Category, ExtensionTable};
    ///
    /// let table = ExtensionTable::standard();
    /// assert_eq!(table.get("PDF"), Some(Category::Documents));
    /// assert_eq!(table.get("xyz123"), None);
    /// ```
    pub fn get(&self, ext: &str) -> Option<Category> {
        self.extension_map.get(&normalize_extension(ext)).copied()
    }

    /// Number of mapped extensions.
    pub fn len(&self) -> usize {
        self.extension_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extension_map.is_empty()
    }
}

impl Default for ExtensionTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// A best-effort source of coarse content types (`image/png`, `text/plain`, ...).
///
/// Answers are a secondary signal only. Implementations must not fail; when
/// nothing can be determined they return `None`.
pub trait ContentTypeOracle {
    /// Guesses a content type for the file at `path`.
    fn infer_type(&self, path: &Path) -> Option<String>;
}

/// Guesses content types the way a desktop would: by name first, then by bytes.
///
/// - A name with an extension is looked up in the `mime_guess` registry.
///   Failing that, the leading bytes go through `infer` magic-number
///   detection.
/// - A name without an extension has only its bytes: `infer` first, then
///   `text/plain` for a non-empty sample that is valid UTF-8 with no NUL
///   bytes.
///
/// Only regular files are opened. Pipes, sockets and devices yield `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSniffer;

impl ContentTypeOracle for ContentSniffer {
    fn infer_type(&self, path: &Path) -> Option<String> {
        if !fs::metadata(path).ok()?.is_file() {
            return None;
        }

        let has_extension = path.extension().is_some_and(|e| !e.is_empty());
        if has_extension {
            if let Some(guess) = mime_guess::from_path(path).first() {
                return Some(guess.essence_str().to_string());
            }
        }

        let sample = read_sample(path)?;
        if let Some(kind) = infer::get(&sample) {
            return Some(kind.mime_type().to_string());
        }

        (!has_extension && looks_like_text(&sample)).then(|| "text/plain".to_string())
    }
}

fn read_sample(path: &Path) -> Option<Vec<u8>> {
    let mut sample = Vec::with_capacity(SNIFF_LEN as usize);
    File::open(path)
        .ok()?
        .take(SNIFF_LEN)
        .read_to_end(&mut sample)
        .ok()?;
    Some(sample)
}

/// An oracle that never knows anything; classification uses the table alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContentType;

impl ContentTypeOracle for NoContentType {
    fn infer_type(&self, _path: &Path) -> Option<String> {
        None
    }
}

fn looks_like_text(sample: &[u8]) -> bool {
    if sample.is_empty() || sample.contains(&0) {
        return false;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        // A multi-byte character cut off by the sample boundary is fine.
        Err(e) => e.error_len().is_none(),
    }
}

/// The outcome of classifying one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    /// Lower-case extension, `no_ext`, or `unknown`. Never empty.
    pub sub_folder: String,
}

/// Maps file paths to a `(Category, sub-folder)` pair.
///
/// # Examples
///
/// ```
/// use sortdir::file_category::{Category, Classifier, ExtensionTable, NoContentType};
/// use std::path::Path;
///
/// let classifier = Classifier::new(ExtensionTable::standard(), NoContentType);
/// let result = classifier.classify(Path::new("Holiday.JPG"));
/// assert_eq!(result.category, Category::Images);
/// assert_eq!(result.sub_folder, "jpg");
/// ```
pub struct Classifier {
    table: ExtensionTable,
    oracle: Box<dyn ContentTypeOracle>,
}

impl Classifier {
    /// Creates a classifier over `table` that falls back to `oracle`.
    pub fn new(table: ExtensionTable, oracle: impl ContentTypeOracle + 'static) -> Self {
        Self {
            table,
            oracle: Box::new(oracle),
        }
    }

    pub fn table(&self) -> &ExtensionTable {
        &self.table
    }

    /// Classifies a path. Total over all paths: never fails.
    ///
    /// 1. No extension: content inference decides, sub-folder is `no_ext`.
    /// 2. Extension in the table: the table decides.
    /// 3. Otherwise content inference decides, falling back to `Others`.
    ///
    /// In cases 2 and 3 the sub-folder is the lower-cased extension, or
    /// `unknown` if the extension is not usable as a folder name.
    pub fn classify(&self, path: &Path) -> Classification {
        let Some(raw_ext) = path.extension().filter(|e| !e.is_empty()) else {
            return Classification {
                category: self.infer_category(path),
                sub_folder: NO_EXTENSION_DIR.to_string(),
            };
        };

        let ext = raw_ext.to_str().map(str::to_lowercase);
        let category = ext
            .as_deref()
            .and_then(|e| self.table.get(e))
            .unwrap_or_else(|| self.infer_category(path));

        let sub_folder = match ext {
            Some(e) if is_folder_safe(&e) => e,
            _ => UNKNOWN_EXTENSION_DIR.to_string(),
        };

        Classification {
            category,
            sub_folder,
        }
    }

    fn infer_category(&self, path: &Path) -> Category {
        self.oracle
            .infer_type(path)
            .map(|content_type| Category::from_content_type(&content_type))
            .unwrap_or(Category::Others)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ExtensionTable::standard(), ContentSniffer)
    }
}

fn is_folder_safe(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name
            .chars()
            .any(|c| c.is_control() || RESERVED_CHARS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Oracle that answers with one fixed content type for every path.
    struct FixedType(Option<&'static str>);

    impl ContentTypeOracle for FixedType {
        fn infer_type(&self, _path: &Path) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn classifier(answer: Option<&'static str>) -> Classifier {
        Classifier::new(ExtensionTable::standard(), FixedType(answer))
    }

    #[test]
    fn test_category_dir_names() {
        assert_eq!(Category::Images.dir_name(), "Images");
        assert_eq!(Category::Videos.dir_name(), "Videos");
        assert_eq!(Category::Audio.dir_name(), "Audio");
        assert_eq!(Category::Documents.dir_name(), "Documents");
        assert_eq!(Category::Archives.dir_name(), "Archives");
        assert_eq!(Category::Code.dir_name(), "Code");
        assert_eq!(Category::Others.dir_name(), "Others");
    }

    #[test]
    fn test_from_dir_name_is_exact() {
        for category in Category::ALL {
            assert_eq!(Category::from_dir_name(category.dir_name()), Some(category));
        }
        assert_eq!(Category::from_dir_name("images"), None);
        assert_eq!(Category::from_dir_name("Misc"), None);
    }

    #[test]
    fn test_content_type_prefix_rules() {
        assert_eq!(Category::from_content_type("image/png"), Category::Images);
        assert_eq!(Category::from_content_type("IMAGE/X-Whatever"), Category::Images);
        assert_eq!(Category::from_content_type("video/webm"), Category::Videos);
        assert_eq!(Category::from_content_type("audio/mpeg"), Category::Audio);
    }

    #[test]
    fn test_content_type_exact_sets() {
        assert_eq!(Category::from_content_type("application/x-tar"), Category::Archives);
        assert_eq!(Category::from_content_type("text/plain"), Category::Documents);
        assert_eq!(Category::from_content_type("application/pdf"), Category::Documents);
        // Exact match only: a near miss falls through.
        assert_eq!(Category::from_content_type("text/plainish"), Category::Others);
        assert_eq!(Category::from_content_type("application/json"), Category::Others);
    }

    #[test]
    fn test_extension_table_case_insensitive() {
        let table = ExtensionTable::standard();
        assert_eq!(table.get("JPG"), Some(Category::Images));
        assert_eq!(table.get("Mp3"), Some(Category::Audio));
        assert_eq!(table.get("rs"), Some(Category::Code));
        assert_eq!(table.get("nope"), None);
    }

    #[test]
    fn test_extension_table_extra_mappings_override() {
        let table = ExtensionTable::with_mappings([
            (".HEIC", Category::Images),
            ("html", Category::Documents),
        ]);
        assert_eq!(table.get("heic"), Some(Category::Images));
        assert_eq!(table.get("html"), Some(Category::Documents));
        assert_eq!(table.len(), ExtensionTable::standard().len() + 1);
    }

    #[test]
    fn test_table_hit_ignores_content_type() {
        let c = classifier(Some("video/mp4"));
        let result = c.classify(Path::new("/tmp/Photo.JPG"));
        assert_eq!(result.category, Category::Images);
        assert_eq!(result.sub_folder, "jpg");
    }

    #[test]
    fn test_unknown_extension_uses_content_type() {
        let c = classifier(Some("image/x-custom"));
        let result = c.classify(Path::new("scan.xyz123"));
        assert_eq!(result.category, Category::Images);
        assert_eq!(result.sub_folder, "xyz123");
    }

    #[test]
    fn test_unknown_extension_without_content_type() {
        let c = classifier(None);
        let result = c.classify(Path::new("b.UnknownExt"));
        assert_eq!(result.category, Category::Others);
        assert_eq!(result.sub_folder, "unknownext");
    }

    #[test]
    fn test_no_extension_uses_content_type() {
        let c = classifier(Some("text/plain"));
        let result = c.classify(Path::new("notes"));
        assert_eq!(result.category, Category::Documents);
        assert_eq!(result.sub_folder, NO_EXTENSION_DIR);

        let c = classifier(None);
        assert_eq!(
            c.classify(Path::new("notes")),
            Classification {
                category: Category::Others,
                sub_folder: NO_EXTENSION_DIR.to_string(),
            }
        );
    }

    #[test]
    fn test_leading_dot_only_has_no_extension() {
        let c = classifier(None);
        assert_eq!(c.classify(Path::new(".bashrc")).sub_folder, NO_EXTENSION_DIR);
        assert_eq!(c.classify(Path::new("trailing.")).sub_folder, NO_EXTENSION_DIR);

        let hidden_txt = c.classify(Path::new(".hidden.txt"));
        assert_eq!(hidden_txt.category, Category::Documents);
        assert_eq!(hidden_txt.sub_folder, "txt");
    }

    #[test]
    fn test_multiple_dots_use_last_extension() {
        let c = classifier(None);
        let result = c.classify(Path::new("backup.2024.tar.GZ"));
        assert_eq!(result.category, Category::Archives);
        assert_eq!(result.sub_folder, "gz");
    }

    #[test]
    fn test_unsafe_extension_goes_to_unknown() {
        let c = classifier(Some("audio/x-odd"));
        let result = c.classify(Path::new("clip.a:b"));
        assert_eq!(result.category, Category::Audio);
        assert_eq!(result.sub_folder, UNKNOWN_EXTENSION_DIR);
    }

    #[test]
    fn test_content_sniffer_detects_png() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("mystery");
        let png: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];
        fs::write(&path, png).expect("Failed to write test file");

        assert_eq!(ContentSniffer.infer_type(&path).as_deref(), Some("image/png"));
    }

    #[test]
    fn test_content_sniffer_detects_text() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("notes");
        fs::write(&path, "buy milk\ncall back — später\n").expect("Failed to write test file");

        assert_eq!(ContentSniffer.infer_type(&path).as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_content_sniffer_gives_up_on_binary_and_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let binary = temp_dir.path().join("blob");
        fs::write(&binary, [0x00u8, 0x13, 0xFE, 0x42]).expect("Failed to write test file");
        let empty = temp_dir.path().join("empty");
        fs::write(&empty, b"").expect("Failed to write test file");

        assert_eq!(ContentSniffer.infer_type(&binary), None);
        assert_eq!(ContentSniffer.infer_type(&empty), None);
        assert_eq!(ContentSniffer.infer_type(&temp_dir.path().join("missing")), None);
    }

    #[test]
    fn test_content_sniffer_prefers_name_over_bytes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let csv = temp_dir.path().join("data.csv");
        fs::write(&csv, "id,name\n1,ada\n").expect("Failed to write test file");

        assert_eq!(ContentSniffer.infer_type(&csv).as_deref(), Some("text/csv"));
    }

    #[test]
    fn test_text_with_unknown_extension_is_not_a_document() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let odd = temp_dir.path().join("b.unknownext");
        fs::write(&odd, "just some words\n").expect("Failed to write test file");
        let csv = temp_dir.path().join("data.csv");
        fs::write(&csv, "id,name\n1,ada\n").expect("Failed to write test file");

        assert_eq!(ContentSniffer.infer_type(&odd), None);

        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify(&odd),
            Classification {
                category: Category::Others,
                sub_folder: "unknownext".to_string(),
            }
        );
        assert_eq!(classifier.classify(&csv).category, Category::Others);
    }

    #[test]
    fn test_magic_bytes_still_place_unknown_extensions() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("scan.xyz123");
        let png: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];
        fs::write(&path, png).expect("Failed to write test file");

        assert_eq!(ContentSniffer.infer_type(&path).as_deref(), Some("image/png"));
    }

    #[cfg(unix)]
    #[test]
    fn test_content_sniffer_does_not_open_fifos() {
        use std::process::Command;
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let fifo = temp_dir.path().join("pipe");
        let made = Command::new("mkfifo").arg(&fifo).status();
        if !made.is_ok_and(|status| status.success()) {
            return;
        }

        // Opening a pipe with no writer blocks, so ask from another thread.
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(ContentSniffer.infer_type(&fifo));
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(None));
    }
}
