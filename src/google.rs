//! Google Drive and Sheets adapters.
//!
//! Both take an already obtained [`Credential`]; token acquisition and refresh
//! happen elsewhere. Requests are made once, without retries.

use crate::cell::{CellRef, RangeSpec, quote_sheet_name};
use crate::config::Visibility;
use crate::error::{StoreError, TabularError};
use crate::remote::{Credential, FileStore, StoreRequest, StoredFile, TabularStore};
use log::debug;
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

fn error_text(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    format!("{} {}", status, body.trim())
}

fn ensure_success(resp: Response) -> Result<Response, String> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(error_text(resp))
    }
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

/// Uploads into a Drive folder and optionally shares the file with anyone who
/// has the link.
pub struct DriveStore {
    client: Client,
    credential: Credential,
}

impl DriveStore {
    pub fn new(credential: Credential) -> Self {
        DriveStore {
            client: Client::new(),
            credential,
        }
    }

    fn share(&self, file_id: &str) -> Result<(), String> {
        let url = format!("{}/{}/permissions", DRIVE_FILES_URL, file_id);
        let resp = self
            .client
            .post(url)
            .bearer_auth(self.credential.token())
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .map_err(|e| e.to_string())?;
        ensure_success(resp).map(|_| ())
    }
}

impl FileStore for DriveStore {
    fn store(&self, request: &StoreRequest<'_>) -> Result<StoredFile, StoreError> {
        let mut metadata = json!({
            "name": request.filename,
            "mimeType": request.mime_type,
        });
        if !request.folder_id.is_empty() {
            metadata["parents"] = json!([request.folder_id]);
        }

        let boundary = format!("submission-linker-{}", Uuid::new_v4().simple());
        let mut body = Vec::with_capacity(request.bytes.len() + 512);
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
                b = boundary,
                m = metadata,
                t = request.mime_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(request.bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let resp = self
            .client
            .post(format!("{}?uploadType=multipart&fields=id", DRIVE_UPLOAD_URL))
            .bearer_auth(self.credential.token())
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .map_err(|e| StoreError::new(format!("upload failed: {}", e)))?;
        let created: CreatedFile = ensure_success(resp)
            .map_err(|e| StoreError::new(format!("upload rejected: {}", e)))?
            .json()
            .map_err(|e| StoreError::new(format!("unexpected upload response: {}", e)))?;
        debug!("Uploaded {} as {}", request.filename, created.id);

        if request.visibility == Visibility::AnyoneWithLink {
            self.share(&created.id)
                .map_err(|e| StoreError::new(format!("sharing {} failed: {}", created.id, e)))?;
        }

        Ok(StoredFile {
            share_url: format!("https://drive.google.com/file/d/{}/view", created.id),
            content_id: created.id,
        })
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

/// The Sheets v4 values API.
pub struct SheetsStore {
    client: Client,
    credential: Credential,
}

impl SheetsStore {
    pub fn new(credential: Credential) -> Self {
        SheetsStore {
            client: Client::new(),
            credential,
        }
    }

    fn values_url(sheet_id: &str, a1: &str) -> Result<Url, String> {
        let mut url = Url::parse(SHEETS_URL).map_err(|e| e.to_string())?;
        url.path_segments_mut()
            .map_err(|_| "sheets URL cannot take a path".to_string())?
            .push(sheet_id)
            .push("values")
            .push(a1);
        Ok(url)
    }
}

/// Row number of the first cell of an A1 range such as `'Term 1'!A10:M10`.
fn first_row_of(range: &str) -> Option<u32> {
    let cells = range.rsplit_once('!').map(|(_, cells)| cells).unwrap_or(range);
    let first = cells.split(':').next()?;
    CellRef::parse(first).map(|cell| cell.row)
}

impl TabularStore for SheetsStore {
    fn read_range(
        &self,
        sheet_id: &str,
        sheet_name: &str,
        range: &RangeSpec,
    ) -> Result<Vec<Vec<String>>, TabularError> {
        let url = Self::values_url(sheet_id, &range.qualified(sheet_name))
            .map_err(TabularError::Read)?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(self.credential.token())
            .send()
            .map_err(|e| TabularError::Read(e.to_string()))?;
        let values: ValueRange = ensure_success(resp)
            .map_err(TabularError::Read)?
            .json()
            .map_err(|e| TabularError::Read(e.to_string()))?;
        Ok(values.values)
    }

    fn write_cell(
        &mut self,
        sheet_id: &str,
        sheet_name: &str,
        cell: CellRef,
        value: &str,
    ) -> Result<(), TabularError> {
        let a1 = format!("{}!{}", quote_sheet_name(sheet_name), cell);
        let mut url = Self::values_url(sheet_id, &a1).map_err(TabularError::Write)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        let resp = self
            .client
            .put(url)
            .bearer_auth(self.credential.token())
            .json(&json!({ "range": a1, "majorDimension": "ROWS", "values": [[value]] }))
            .send()
            .map_err(|e| TabularError::Write(e.to_string()))?;
        ensure_success(resp).map_err(TabularError::Write)?;
        Ok(())
    }

    fn append_row(
        &mut self,
        sheet_id: &str,
        sheet_name: &str,
        values: &[String],
    ) -> Result<u32, TabularError> {
        let a1 = format!("{}!A1:append", quote_sheet_name(sheet_name));
        let mut url = Self::values_url(sheet_id, &a1).map_err(TabularError::Write)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        let resp = self
            .client
            .post(url)
            .bearer_auth(self.credential.token())
            .json(&json!({ "majorDimension": "ROWS", "values": [values] }))
            .send()
            .map_err(|e| TabularError::Write(e.to_string()))?;
        let appended: AppendResponse = ensure_success(resp)
            .map_err(TabularError::Write)?
            .json()
            .map_err(|e| TabularError::Write(e.to_string()))?;
        first_row_of(&appended.updates.updated_range).ok_or_else(|| {
            TabularError::Write(format!(
                "cannot tell which row was appended from {:?}",
                appended.updates.updated_range
            ))
        })
    }
}
