use crate::Errors;
use image::{ImageFormat, RgbImage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%(0?)(\d*)d").expect("Placeholder regex must compile"));

/// Source of decoded frames, pulled by the producer thread
///
pub trait FrameReader: Send {
    /// Human-readable description used in logs
    ///
    fn describe(&self) -> String;

    /// Reads the next frame.
    ///
    /// [`Errors::SourceExhausted`] marks the end of the source, every other error is a read failure.
    ///
    fn read(&mut self) -> Result<RgbImage, Errors>;

    /// Prepares the reader for another attempt after a read failure
    ///
    fn reopen(&mut self) -> Result<(), Errors> {
        Ok(())
    }
}

impl<R: FrameReader + ?Sized> FrameReader for Box<R> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn read(&mut self) -> Result<RgbImage, Errors> {
        (**self).read()
    }

    fn reopen(&mut self) -> Result<(), Errors> {
        (**self).reopen()
    }
}

/// Opens a reader for the source identifier.
///
/// * a path with a single `%d` / `%0Nd` placeholder is a numbered image sequence;
/// * a directory yields its image files sorted by name;
/// * a file yields the single image;
/// * camera devices (an index or `/dev/video*`) require a dedicated [`FrameReader`].
///
pub fn open(source: &str) -> Result<Box<dyn FrameReader>, Errors> {
    if (!source.is_empty() && source.chars().all(|c| c.is_ascii_digit()))
        || source.starts_with("/dev/video")
    {
        return Err(Errors::UnsupportedSource(format!(
            "{source} (camera capture needs a device-specific frame reader)"
        )));
    }

    if ImageSequenceReader::is_pattern(source) {
        return Ok(Box::new(ImageSequenceReader::new(source)?));
    }

    let path = Path::new(source);
    if path.is_dir() {
        Ok(Box::new(ImageListReader::from_dir(path)?))
    } else if path.is_file() {
        Ok(Box::new(ImageListReader::new(vec![path.to_path_buf()])))
    } else {
        Err(Errors::UnsupportedSource(source.to_string()))
    }
}

fn load_image(path: &Path, index: u64) -> Result<RgbImage, Errors> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|e| Errors::FrameRead {
            index,
            reason: format!("{}: {}", path.display(), e),
        })
}

/// Numbered image sequence like `frames/ball-%02d.png`.
///
/// Numbering starts at 0 (or 1 when frame 0 is missing) and ends at the first missing file.
///
#[derive(Debug, Clone)]
pub struct ImageSequenceReader {
    prefix: String,
    suffix: String,
    width: usize,
    zero_pad: bool,
    next: u64,
    started: bool,
}

impl ImageSequenceReader {
    pub fn is_pattern(source: &str) -> bool {
        PLACEHOLDER.is_match(source)
    }

    pub fn new(pattern: &str) -> Result<Self, Errors> {
        let mut placeholders = PLACEHOLDER.captures_iter(pattern);
        let caps = placeholders
            .next()
            .ok_or_else(|| Errors::InvalidPattern(pattern.to_string()))?;
        if placeholders.next().is_some() {
            return Err(Errors::InvalidPattern(format!(
                "{pattern} (exactly one placeholder expected)"
            )));
        }

        let whole = caps.get(0).expect("Group 0 is always present");
        let width = match caps.get(2).map(|m| m.as_str()) {
            Some("") | None => 0,
            Some(w) => w
                .parse::<usize>()
                .map_err(|_| Errors::InvalidPattern(pattern.to_string()))?,
        };

        Ok(Self {
            prefix: pattern[..whole.start()].to_string(),
            suffix: pattern[whole.end()..].to_string(),
            width,
            zero_pad: caps.get(1).map(|m| !m.as_str().is_empty()).unwrap_or(false),
            next: 0,
            started: false,
        })
    }

    pub fn path(&self, index: u64) -> PathBuf {
        let number = if self.zero_pad {
            format!("{:0width$}", index, width = self.width)
        } else {
            format!("{:>width$}", index, width = self.width)
        };
        PathBuf::from(format!("{}{}{}", self.prefix, number, self.suffix))
    }
}

impl FrameReader for ImageSequenceReader {
    fn describe(&self) -> String {
        format!("image sequence {}", self.path(self.next).display())
    }

    fn read(&mut self) -> Result<RgbImage, Errors> {
        if !self.started {
            self.started = true;
            if !self.path(0).exists() && self.path(1).exists() {
                self.next = 1;
            }
        }

        let path = self.path(self.next);
        if !path.exists() {
            return Err(Errors::SourceExhausted);
        }
        let image = load_image(&path, self.next)?;
        self.next += 1;
        Ok(image)
    }
}

/// Explicit list of image files read in order
///
#[derive(Debug, Clone)]
pub struct ImageListReader {
    paths: Vec<PathBuf>,
    position: usize,
}

impl ImageListReader {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths, position: 0 }
    }

    /// Image files of the directory, sorted by file name
    ///
    pub fn from_dir(dir: &Path) -> Result<Self, Errors> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| Errors::UnsupportedSource(format!("{}: {}", dir.display(), e)))?;
        let mut paths = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && ImageFormat::from_path(p).is_ok())
            .collect::<Vec<_>>();
        paths.sort();
        Ok(Self::new(paths))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameReader for ImageListReader {
    fn describe(&self) -> String {
        match (self.paths.first(), self.paths.last()) {
            (Some(first), Some(last)) => format!(
                "image list of {} files ({} .. {})",
                self.paths.len(),
                first.display(),
                last.display()
            ),
            _ => "empty image list".to_string(),
        }
    }

    fn read(&mut self) -> Result<RgbImage, Errors> {
        let path = self.paths.get(self.position).ok_or(Errors::SourceExhausted)?;
        let image = load_image(path, self.position as u64)?;
        self.position += 1;
        Ok(image)
    }
}

/// Preloaded frames, for deterministic replay
///
#[derive(Debug, Clone, Default)]
pub struct InMemoryReader {
    frames: VecDeque<RgbImage>,
    looped: bool,
}

impl InMemoryReader {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames: frames.into(),
            looped: false,
        }
    }

    /// Replays the frames endlessly
    ///
    pub fn looped(mut self) -> Self {
        self.looped = true;
        self
    }
}

impl FrameReader for InMemoryReader {
    fn describe(&self) -> String {
        format!(
            "{} in-memory frames{}",
            self.frames.len(),
            if self.looped { " (looped)" } else { "" }
        )
    }

    fn read(&mut self) -> Result<RgbImage, Errors> {
        let frame = self.frames.pop_front().ok_or(Errors::SourceExhausted)?;
        if self.looped {
            self.frames.push_back(frame.clone());
        }
        Ok(frame)
    }
}
