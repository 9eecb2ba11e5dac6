//! Bulletin board fetcher.
//!
//! Walks from the board list page to the newest report's detail page,
//! resolves its first attachment, streams the PDF to a scoped temporary
//! file, and extracts the text page by page. The temporary file is removed
//! on every exit path (success, download failure, extraction failure,
//! panic) because the guard deletes it on drop.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use scraper::{Html, Selector};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use url::Url;

use crate::config::BoardConfig;
use crate::error::PipelineError;
use crate::models::Report;

/// Site convention for picking the downloadable variant among attachment
/// siblings: the detail page links file serial 0, the full PDF is serial 1.
/// A plain substring replacement, not a general query-string edit.
const FILE_VARIANT_FROM: &str = "fileSn=0";
const FILE_VARIANT_TO: &str = "fileSn=1";

/// Fetch the newest report from the board and return its extracted text.
pub async fn fetch_latest_report(config: &BoardConfig) -> Result<Report, PipelineError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Download(e.to_string()))?;

    let base = Url::parse(&config.base_url)
        .map_err(|e| PipelineError::Download(format!("invalid base url: {}", e)))?;

    let list_html = get_page(&client, &config.list_url, timeout).await?;
    let detail_href = first_list_link(&list_html)?;
    let detail_url = base
        .join(&detail_href)
        .map_err(|e| PipelineError::Download(format!("bad detail link '{}': {}", detail_href, e)))?;

    let detail_html = get_page(&client, detail_url.as_str(), timeout).await?;
    let attachment_href = first_attachment_link(&detail_html)?;
    let attachment_url = base
        .join(&attachment_href)
        .map(|u| select_file_variant(u.as_str()))
        .map_err(|e| {
            PipelineError::Download(format!("bad attachment link '{}': {}", attachment_href, e))
        })?;

    info!(detail = %detail_url, attachment = %attachment_url, "downloading newest report");
    let artifact = download_to_temp(
        &client,
        &attachment_url,
        config.download_dir.as_deref(),
        timeout,
    )
    .await?;

    let text = extract_pdf_text(artifact.path())?;
    debug!(chars = text.chars().count(), "report text extracted");

    Ok(Report {
        detail_url: detail_url.into(),
        attachment_url,
        text,
    })
}

async fn get_page(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String, PipelineError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PipelineError::from_reqwest(e, timeout, PipelineError::Download))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::Download(format!("HTTP {} for {}", status, url)));
    }

    response
        .text()
        .await
        .map_err(|e| PipelineError::from_reqwest(e, timeout, PipelineError::Download))
}

/// First anchor inside the results table. Site-native ordering puts the
/// newest report first; no date parsing happens here.
fn first_list_link(html: &str) -> Result<String, PipelineError> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("table tbody tr a").unwrap();
    doc.select(&selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.to_string())
        .ok_or_else(|| PipelineError::NotFound("no entry in board list table".to_string()))
}

/// First anchor inside the detail page's attachment container.
fn first_attachment_link(html: &str) -> Result<String, PipelineError> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("div.fileList a").unwrap();
    doc.select(&selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.to_string())
        .ok_or_else(|| PipelineError::NotFound("no attachment link in detail page".to_string()))
}

fn select_file_variant(url: &str) -> String {
    url.replace(FILE_VARIANT_FROM, FILE_VARIANT_TO)
}

/// Stream the attachment into a temp file scoped to this call.
///
/// The returned guard deletes the file when dropped, which covers every
/// exit path out of the caller.
async fn download_to_temp(
    client: &reqwest::Client,
    url: &str,
    download_dir: Option<&Path>,
    timeout: Duration,
) -> Result<NamedTempFile, PipelineError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("report-").suffix(".pdf");

    let mut artifact = match download_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| PipelineError::Download(e.to_string()))?;
            builder.tempfile_in(dir)
        }
        None => builder.tempfile(),
    }
    .map_err(|e| PipelineError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PipelineError::from_reqwest(e, timeout, PipelineError::Download))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::Download(format!("HTTP {} for {}", status, url)));
    }

    let file = artifact.as_file_mut();
    let mut bytes_written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| PipelineError::from_reqwest(e, timeout, PipelineError::Download))?
    {
        file.write_all(&chunk)
            .map_err(|e| PipelineError::Download(e.to_string()))?;
        bytes_written += chunk.len() as u64;
    }
    file.flush()
        .map_err(|e| PipelineError::Download(e.to_string()))?;

    match std::fs::metadata(artifact.path()) {
        Ok(meta) if meta.len() > 0 => {}
        _ => return Err(PipelineError::FileMissing(artifact.path().to_path_buf())),
    }

    debug!(bytes = bytes_written, path = %artifact.path().display(), "download complete");
    Ok(artifact)
}

/// Extract text page by page, concatenated in document order.
fn extract_pdf_text(path: &Path) -> Result<String, PipelineError> {
    let pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| PipelineError::Extraction(e.to_string()))?;
    Ok(pages.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_variant_substitution() {
        let url = "https://board.example.go.kr/cmm/download?fileSn=0&bbsId=X";
        assert_eq!(
            select_file_variant(url),
            "https://board.example.go.kr/cmm/download?fileSn=1&bbsId=X"
        );
    }

    #[test]
    fn file_variant_leaves_other_urls_alone() {
        let url = "https://board.example.go.kr/cmm/download?fileSn=2&bbsId=X";
        assert_eq!(select_file_variant(url), url);
    }

    #[test]
    fn first_list_link_takes_first_row() {
        let html = r#"
            <table><tbody>
              <tr><td><a href="/board/view.do?id=9">오늘 보고서</a></td></tr>
              <tr><td><a href="/board/view.do?id=8">어제 보고서</a></td></tr>
            </tbody></table>
        "#;
        assert_eq!(first_list_link(html).unwrap(), "/board/view.do?id=9");
    }

    #[test]
    fn list_without_tbody_still_matches() {
        // html5ever inserts tbody around bare rows, like a browser does.
        let html = r#"<table><tr><td><a href="/view?id=1">r</a></td></tr></table>"#;
        assert_eq!(first_list_link(html).unwrap(), "/view?id=1");
    }

    #[test]
    fn empty_list_is_not_found() {
        let err = first_list_link("<table><tbody></tbody></table>").unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn attachment_link_found_in_container() {
        let html = r#"
            <div class="fileList">
              <a href="/cmm/download?fileSn=0&amp;bbsId=X">report.pdf</a>
              <a href="/cmm/download?fileSn=0&amp;bbsId=Y">other.hwp</a>
            </div>
        "#;
        assert_eq!(
            first_attachment_link(html).unwrap(),
            "/cmm/download?fileSn=0&bbsId=X"
        );
    }

    #[test]
    fn missing_attachment_container_is_not_found() {
        let err = first_attachment_link("<div class='content'>no files</div>").unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn container_without_anchor_is_not_found() {
        let err = first_attachment_link(r#"<div class="fileList"><span>none</span></div>"#)
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn invalid_pdf_is_extraction_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not a pdf").unwrap();
        let err = extract_pdf_text(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(_)));
    }
}
