//! Magic-byte detection of file content.
//!
//! The declared extension only narrows what an endpoint accepts; the leading
//! bytes decide what the payload actually is.

use serde::Serialize;

/// Content kind recognised from leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Zip,
    Png,
    Jpeg,
    Gif,
    Bmp,
    Webp,
    Tiff,
    Svg,
    Mp3,
    Wav,
    Ogg,
    Flac,
    Aac,
    /// ISO base media (`ftyp` box): mp4, m4a, m4v, mov.
    Mp4,
    /// EBML: mkv, webm.
    Matroska,
    Avi,
    /// Advanced Systems Format: wmv, wma.
    Asf,
    Flv,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Zip => "zip",
            FileKind::Png => "png",
            FileKind::Jpeg => "jpeg",
            FileKind::Gif => "gif",
            FileKind::Bmp => "bmp",
            FileKind::Webp => "webp",
            FileKind::Tiff => "tiff",
            FileKind::Svg => "svg",
            FileKind::Mp3 => "mp3",
            FileKind::Wav => "wav",
            FileKind::Ogg => "ogg",
            FileKind::Flac => "flac",
            FileKind::Aac => "aac",
            FileKind::Mp4 => "mp4",
            FileKind::Matroska => "matroska",
            FileKind::Avi => "avi",
            FileKind::Asf => "asf",
            FileKind::Flv => "flv",
        }
    }

    fn is_image(self) -> bool {
        matches!(
            self,
            FileKind::Png
                | FileKind::Jpeg
                | FileKind::Gif
                | FileKind::Bmp
                | FileKind::Webp
                | FileKind::Tiff
                | FileKind::Svg
        )
    }

    fn is_audio(self) -> bool {
        matches!(
            self,
            FileKind::Mp3 | FileKind::Wav | FileKind::Ogg | FileKind::Flac | FileKind::Aac
        )
    }

    fn is_video(self) -> bool {
        matches!(
            self,
            FileKind::Mp4 | FileKind::Matroska | FileKind::Avi | FileKind::Asf | FileKind::Flv
        )
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an endpoint is willing to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    Pdf,
    Image,
    /// Audio or video; transcription accepts both.
    Media,
    Video,
    Archive,
}

const PDF_EXTENSIONS: &[&str] = &["pdf"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif", "svg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm", "wmv", "flv", "m4v"];
const MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "m4a", "ogg", "flac", "aac", "wma", "mp4", "avi", "mov", "mkv", "webm", "wmv",
    "flv", "m4v",
];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip"];

impl ExpectedKind {
    pub fn accepts(self, kind: FileKind) -> bool {
        match self {
            ExpectedKind::Pdf => kind == FileKind::Pdf,
            ExpectedKind::Image => kind.is_image(),
            ExpectedKind::Media => kind.is_audio() || kind.is_video(),
            ExpectedKind::Video => kind.is_video(),
            ExpectedKind::Archive => kind == FileKind::Zip,
        }
    }

    /// Lowercase extensions (without the dot) allowed for this kind.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ExpectedKind::Pdf => PDF_EXTENSIONS,
            ExpectedKind::Image => IMAGE_EXTENSIONS,
            ExpectedKind::Media => MEDIA_EXTENSIONS,
            ExpectedKind::Video => VIDEO_EXTENSIONS,
            ExpectedKind::Archive => ARCHIVE_EXTENSIONS,
        }
    }

    pub fn accepts_extension(self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.extensions().contains(&extension.as_str())
    }
}

impl std::str::FromStr for ExpectedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExpectedKind::Pdf),
            "image" => Ok(ExpectedKind::Image),
            "media" => Ok(ExpectedKind::Media),
            "video" => Ok(ExpectedKind::Video),
            "archive" | "zip" => Ok(ExpectedKind::Archive),
            other => Err(format!("unknown kind '{other}'")),
        }
    }
}

/// Signatures anchored at offset zero.
const PREFIXES: &[(&[u8], FileKind)] = &[
    (b"%PDF", FileKind::Pdf),
    (b"PK\x03\x04", FileKind::Zip),
    (b"PK\x05\x06", FileKind::Zip),
    (b"\x89PNG\r\n\x1a\n", FileKind::Png),
    (b"\xFF\xD8\xFF", FileKind::Jpeg),
    (b"GIF87a", FileKind::Gif),
    (b"GIF89a", FileKind::Gif),
    (b"II*\x00", FileKind::Tiff),
    (b"MM\x00*", FileKind::Tiff),
    (b"ID3", FileKind::Mp3),
    (b"OggS", FileKind::Ogg),
    (b"fLaC", FileKind::Flac),
    (b"\x1A\x45\xDF\xA3", FileKind::Matroska),
    (
        b"\x30\x26\xB2\x75\x8E\x66\xCF\x11\xA6\xD9\x00\xAA\x00\x62\xCE\x6C",
        FileKind::Asf,
    ),
    (b"FLV", FileKind::Flv),
    (b"BM", FileKind::Bmp),
];

const SVG_SNIFF_LEN: usize = 1000;

/// Identify `content` from its leading bytes.
pub fn detect(content: &[u8]) -> Option<FileKind> {
    if let Some((_, kind)) = PREFIXES.iter().find(|(magic, _)| content.starts_with(magic)) {
        return Some(*kind);
    }

    // RIFF containers carry their form type at offset 8.
    if content.len() >= 12 && content.starts_with(b"RIFF") {
        return match &content[8..12] {
            b"WEBP" => Some(FileKind::Webp),
            b"WAVE" => Some(FileKind::Wav),
            b"AVI " => Some(FileKind::Avi),
            _ => None,
        };
    }

    // ISO base media: box size, then "ftyp".
    if content.len() >= 8 && &content[4..8] == b"ftyp" {
        return Some(FileKind::Mp4);
    }

    // MPEG audio frame sync (mp3 without ID3) and ADTS (aac).
    if content.len() >= 2 && content[0] == 0xFF {
        match content[1] & 0xF6 {
            0xF0 => return Some(FileKind::Aac),
            0xF2 | 0xF4 | 0xF6 => return Some(FileKind::Mp3),
            _ => {}
        }
    }

    if is_svg(content) {
        return Some(FileKind::Svg);
    }

    None
}

fn is_svg(content: &[u8]) -> bool {
    let head = &content[..content.len().min(SVG_SNIFF_LEN)];
    let text = String::from_utf8_lossy(head).to_ascii_lowercase();
    text.contains("<svg") || (text.contains("<?xml") && text.contains("svg"))
}
