//! File search against the Drive REST surface.
//!
//! Mirrors the fields the rest of the app consumes: id, name, mime type,
//! icon and web links, and the modification timestamp, newest first.

use tracing::debug;

use crate::api::{construct_api_url, ApiError, DriveFile, DriveFileList};

pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

const PAGE_SIZE: u32 = 20;
const FILE_FIELDS: &str = "files(id, name, mimeType, iconLink, webViewLink, modifiedTime)";

/// Build the `q` expression for `files.list`: never trashed, optionally
/// narrowed to names containing the search term.
pub fn build_file_query(search: Option<&str>) -> String {
    let mut q = String::from("trashed=false");
    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        q.push_str(" and name contains '");
        q.push_str(&escape_query_term(term));
        q.push('\'');
    }
    q
}

// Drive query strings are single-quoted; backslashes must be doubled before
// quotes are escaped or the escape itself gets escaped.
fn escape_query_term(term: &str) -> String {
    term.replace('\\', "\\\\").replace('\'', "\\'")
}

/// List the user's files, optionally filtered by a free-text name query.
/// A 401 surfaces as [`ApiError::Unauthorized`] so the caller can drop the
/// session instead of reporting a generic failure.
pub async fn search_files(
    client: &reqwest::Client,
    base_url: &str,
    access_token: &str,
    search: Option<&str>,
) -> Result<Vec<DriveFile>, ApiError> {
    let url = construct_api_url(base_url, "files");
    let q = build_file_query(search);
    let page_size = PAGE_SIZE.to_string();
    debug!(query = %q, "drive file search");

    let response = client
        .get(url)
        .query(&[
            ("pageSize", page_size.as_str()),
            ("fields", FILE_FIELDS),
            ("q", q.as_str()),
            ("orderBy", "modifiedTime desc"),
        ])
        .bearer_auth(access_token)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ApiError::from_response(response).await);
    }

    let listing = response.json::<DriveFileList>().await?;
    Ok(listing.files)
}

impl DriveFile {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("Untitled")
    }
}
