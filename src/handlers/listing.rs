use super::{HandlerResponse, RequestContext, RequestHandler, HTML_CONTENT_TYPE};
use crate::pages::{listing_page, ListingEntry, ListingPage};
use chrono::{DateTime, Local};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders a browsable HTML index of a directory.
///
/// Subdirectories are listed first, then files, each group in the order the
/// filesystem enumerates them. Links are absolute paths relative to `root_path`.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    root_path: PathBuf,
}

impl DirectoryListing {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Builds the listing page for `local_path`, shown as `/<request_path>`.
    pub fn render_directory_list(&self, request_path: &str, local_path: &Path) -> io::Result<String> {
        let request_path = request_path.trim_matches('/');
        let directory_name = format!("/{request_path}");
        let parent_link = match request_path.rfind('/') {
            Some(idx) => encode_link(request_path[..idx].split('/')),
            None => "/".to_string(),
        };

        let mut directories = Vec::new();
        let mut files = Vec::new();
        for entry in fs::read_dir(local_path)? {
            let entry = entry?;
            // follow symlinks so a linked directory lists as a directory
            let metadata = match fs::metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(_) => entry.metadata()?,
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let link = self.link_for(&entry.path());
            let modified = format_timestamp(metadata.modified().ok());

            if metadata.is_dir() {
                directories.push(ListingEntry {
                    marker: "[D]",
                    name,
                    link,
                    modified,
                    size: "-".to_string(),
                });
            } else {
                files.push(ListingEntry {
                    marker: "[F]",
                    name,
                    link,
                    modified,
                    size: size_string(metadata.len()),
                });
            }
        }

        debug!(
            path = %directory_name,
            directories = directories.len(),
            files = files.len(),
            "Rendering directory listing"
        );

        directories.append(&mut files);
        let page = ListingPage {
            directory_name,
            parent_link,
            entries: directories,
        };
        listing_page(&page).map_err(io::Error::other)
    }

    /// Link to `path`: relative to the root, `/`-separated, percent-encoded per
    /// segment and prefixed with `/`.
    fn link_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root_path).unwrap_or(path);
        let relative = relative.to_string_lossy();
        encode_link(relative.split(['/', '\\']))
    }
}

fn encode_link<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    let mut link = String::new();
    for segment in segments.filter(|s| !s.is_empty()) {
        link.push('/');
        link.push_str(&urlencoding::encode(segment));
    }
    if link.is_empty() {
        link.push('/');
    }
    link
}

fn format_timestamp(time: Option<SystemTime>) -> String {
    time.map(|t| DateTime::<Local>::from(t).format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// Human-readable file size: `B` below 1024, then `K`, `M` and `G` with at most
/// two decimals and no trailing zeros.
///
/// ```rust
/// use scriptpage::handlers::size_string;
///
/// assert_eq!(size_string(500), "500B");
/// assert_eq!(size_string(2048), "2K");
/// assert_eq!(size_string(1536), "1.5K");
/// ```
#[must_use]
pub fn size_string(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes}B");
    }
    let mut value = bytes as f64 / 1024.0;
    for unit in ["K", "M"] {
        if value < 1024.0 {
            return format!("{}{unit}", two_decimals(value));
        }
        value /= 1024.0;
    }
    format!("{}G", two_decimals(value))
}

fn two_decimals(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl RequestHandler for DirectoryListing {
    fn handle(
        &self,
        _ctx: &RequestContext,
        request_path: &str,
        local_path: &Path,
        response: &mut HandlerResponse,
    ) -> io::Result<()> {
        response.set_content_type(HTML_CONTENT_TYPE);
        let page = self.render_directory_list(request_path, local_path)?;
        response.write_all(page.as_bytes())
    }
}
