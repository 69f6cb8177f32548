use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Serialize, Serializer};
use tokio::fs;
use url::Url;

use crate::errors::ImageError;

pub const PNG: &str = "image/png";
pub const JPEG: &str = "image/jpeg";
pub const GIF: &str = "image/gif";
pub const WEBP: &str = "image/webp";

/// Handle to image bytes travelling between the canvas and the model.
///
/// Either an embedded base64 payload or a local file. Network URLs are
/// rejected at parse time; the bytes must always be reachable without a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    Embedded { mime_type: String, data: String },
    Local { path: PathBuf, mime_type: String },
}

impl ImageReference {
    pub fn embedded(mime_type: &str, data: impl Into<String>) -> Self {
        Self::Embedded {
            mime_type: normalize_mime(mime_type),
            data: data.into(),
        }
    }

    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        Self::embedded(mime_type, BASE64_STANDARD.encode(bytes))
    }

    pub fn from_bytes_sniffed(bytes: &[u8]) -> Result<Self, ImageError> {
        let mime_type = sniff_mime(bytes)
            .ok_or_else(|| ImageError::UnknownMimeType("无法识别的图片文件头".to_string()))?;
        Ok(Self::from_bytes(bytes, mime_type))
    }

    /// Accepts `data:<mime>;base64,<payload>` and `file://` URIs.
    pub fn parse(input: &str, mime_hint: Option<&str>) -> Result<Self, ImageError> {
        let input = input.trim();

        if let Some(rest) = input.strip_prefix("data:") {
            return parse_data_uri(rest);
        }

        if input.starts_with("file://") {
            let path = Url::parse(input)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| ImageError::UnsupportedUri(input.to_string()))?;
            let mime_type = match mime_hint {
                Some(hint) => normalize_mime(hint),
                None => mime_from_extension(&path)
                    .ok_or_else(|| ImageError::UnknownMimeType(input.to_string()))?
                    .to_string(),
            };
            ensure_image_mime(&mime_type)?;
            return Ok(Self::Local { path, mime_type });
        }

        Err(ImageError::UnsupportedUri(input.to_string()))
    }

    /// Reads a canvas export from disk and embeds it.
    pub async fn load_path(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let bytes = fs::read(path).await?;
        let mime_type = sniff_mime(&bytes)
            .or_else(|| mime_from_extension(path))
            .ok_or_else(|| ImageError::UnknownMimeType(path.display().to_string()))?;
        Ok(Self::from_bytes(&bytes, mime_type))
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Self::Embedded { mime_type, .. } | Self::Local { mime_type, .. } => mime_type,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Embedded { data, .. } => data.trim().is_empty(),
            Self::Local { path, .. } => path.as_os_str().is_empty(),
        }
    }

    pub fn uri(&self) -> String {
        match self {
            Self::Embedded { mime_type, data } => format!("data:{mime_type};base64,{data}"),
            Self::Local { path, .. } => Url::from_file_path(path)
                .map(String::from)
                .unwrap_or_else(|_| format!("file://{}", path.display())),
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self.mime_type() {
            JPEG => "jpg",
            GIF => "gif",
            WEBP => "webp",
            _ => "png",
        }
    }

    /// Turns a local reference into an embedded one.
    ///
    /// The file must carry a recognised image header, whatever its declared type.
    pub async fn resolve(&self) -> Result<Self, ImageError> {
        match self {
            Self::Embedded { .. } => Ok(self.clone()),
            Self::Local { path, mime_type } => {
                let bytes = fs::read(path).await?;
                if sniff_mime(&bytes).is_none() {
                    return Err(ImageError::UnknownMimeType(format!(
                        "{} 不是图片文件",
                        path.display()
                    )));
                }
                Ok(Self::from_bytes(&bytes, mime_type))
            }
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    pub async fn decode(&self) -> Result<Vec<u8>, ImageError> {
        match self {
            Self::Embedded { data, .. } => Ok(BASE64_STANDARD.decode(data.trim())?),
            Self::Local { path, .. } => Ok(fs::read(path).await?),
        }
    }
}

impl Serialize for ImageReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.uri())
    }
}

fn parse_data_uri(rest: &str) -> Result<ImageReference, ImageError> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageError::MalformedDataUri("缺少 ',' 分隔符".to_string()))?;

    let mut params = header.split(';');
    let mime_type = normalize_mime(params.next().unwrap_or_default());
    if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
        return Err(ImageError::MalformedDataUri(
            "只支持 base64 编码的 data URI".to_string(),
        ));
    }
    ensure_image_mime(&mime_type)?;

    let payload = payload.trim();
    if payload.is_empty() {
        return Err(ImageError::MalformedDataUri("图片内容为空".to_string()));
    }
    BASE64_STANDARD.decode(payload)?;

    Ok(ImageReference::Embedded {
        mime_type,
        data: payload.to_string(),
    })
}

fn ensure_image_mime(mime_type: &str) -> Result<(), ImageError> {
    if mime_type.starts_with("image/") {
        Ok(())
    } else {
        Err(ImageError::UnknownMimeType(mime_type.to_string()))
    }
}

pub fn normalize_mime(mime_type: &str) -> String {
    let normalized = mime_type.trim().to_ascii_lowercase();
    if normalized == "image/jpg" {
        JPEG.to_string()
    } else {
        normalized
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some(PNG),
        "jpg" | "jpeg" => Some(JPEG),
        "gif" => Some(GIF),
        "webp" => Some(WEBP),
        _ => None,
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(PNG)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(JPEG)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(GIF)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(WEBP)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn parses_base64_data_uri() {
        let image = ImageReference::parse("data:image/PNG;base64,aGVsbG8=", None).unwrap();
        assert_eq!(image, ImageReference::embedded(PNG, "aGVsbG8="));
        assert_eq!(image.uri(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn normalizes_jpg_alias() {
        let image = ImageReference::parse("data:image/jpg;base64,aGVsbG8=", None).unwrap();
        assert_eq!(image.mime_type(), JPEG);
        assert_eq!(image.file_extension(), "jpg");
    }

    #[test]
    fn rejects_network_urls() {
        let err = ImageReference::parse("https://example.com/cat.png", None).unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedUri(_)));
    }

    #[test]
    fn rejects_non_base64_and_non_image_data_uris() {
        assert!(matches!(
            ImageReference::parse("data:image/png,raw", None),
            Err(ImageError::MalformedDataUri(_))
        ));
        assert!(matches!(
            ImageReference::parse("data:text/plain;base64,aGVsbG8=", None),
            Err(ImageError::UnknownMimeType(_))
        ));
        assert!(matches!(
            ImageReference::parse("data:image/png;base64,", None),
            Err(ImageError::MalformedDataUri(_))
        ));
        assert!(matches!(
            ImageReference::parse("data:image/png;base64,@@@", None),
            Err(ImageError::Base64(_))
        ));
    }

    #[test]
    fn file_uri_takes_mime_from_hint_or_extension() {
        let image = ImageReference::parse("file:///tmp/sketch.jpeg", None).unwrap();
        assert_eq!(image.mime_type(), JPEG);

        let image = ImageReference::parse("file:///tmp/sketch", Some("image/png")).unwrap();
        assert_eq!(image.mime_type(), PNG);
        assert_eq!(image.uri(), "file:///tmp/sketch");

        assert!(ImageReference::parse("file:///tmp/sketch", None).is_err());
    }

    #[test]
    fn file_uri_is_percent_decoded_and_accepts_localhost() {
        let image = ImageReference::parse("file:///tmp/my%20sketch.png", None).unwrap();
        assert_eq!(
            image,
            ImageReference::Local {
                path: PathBuf::from("/tmp/my sketch.png"),
                mime_type: PNG.to_string(),
            }
        );

        let image = ImageReference::parse("file://localhost/tmp/sketch.png", None).unwrap();
        assert!(matches!(image, ImageReference::Local { ref path, .. } if path == Path::new("/tmp/sketch.png")));

        assert!(matches!(
            ImageReference::parse("file://fileserver/share/sketch.png", None),
            Err(ImageError::UnsupportedUri(_))
        ));
    }

    #[tokio::test]
    async fn local_reference_without_image_header_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.txt");
        tokio::fs::write(&path, b"API_TOKEN=hunter2").await.unwrap();

        let local = ImageReference::parse(&format!("file://{}", path.display()), Some("image/png"))
            .unwrap();
        assert!(matches!(
            local.resolve().await,
            Err(ImageError::UnknownMimeType(_))
        ));
    }

    #[test]
    fn sniffs_png_bytes() {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.extend_from_slice(b"rest");
        let image = ImageReference::from_bytes_sniffed(&bytes).unwrap();
        assert_eq!(image.mime_type(), PNG);
        assert!(ImageReference::from_bytes_sniffed(b"plain text").is_err());
    }

    #[tokio::test]
    async fn local_reference_resolves_to_embedded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.png");
        let mut bytes = PNG_HEADER.to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);
        tokio::fs::write(&path, &bytes).await.unwrap();

        let local = ImageReference::parse(&format!("file://{}", path.display()), None).unwrap();
        let resolved = local.resolve().await.unwrap();
        assert!(matches!(resolved, ImageReference::Embedded { .. }));
        assert_eq!(resolved.decode().await.unwrap(), bytes);

        let loaded = ImageReference::load_path(&path).await.unwrap();
        assert_eq!(loaded, resolved);
    }

    #[test]
    fn serializes_as_uri() {
        let image = ImageReference::embedded(PNG, "AAAA");
        assert_eq!(
            serde_json::to_value(&image).unwrap(),
            serde_json::json!("data:image/png;base64,AAAA")
        );
    }
}
