// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 列车控制器
//!
//! 根据表单中的 `submit` 字段执行上传、编辑、删除或新增，之后重新读取全部记录，
//! 渲染一个完整的新页面。用户输入错误与数据库写入失败都以提示文本的形式出现在页面中。

use log::{debug, info, warn};

use super::csv::TrainsCsvParser;
use super::dao::TrainStore;
use super::model::Train;
use super::view::*;
use crate::component::Page;
use crate::controller::Controller;
use crate::exception::Exception;
use crate::param::HttpRequestMethod;
use crate::request::HttpRequest;
use crate::response::HttpResponse;

pub const PAGE_TITLE: &str = "Train Listing";
pub const PAGE_DESCRIPTION: &str = "Lists train data from an uploaded CSV file";
pub const CSV_CONTENT_TYPE: &str = "text/csv";

pub const NO_FILE_SELECTED: &str = "You must select a file to upload";
pub const NOT_A_CSV: &str = "The uploaded file must be a CSV. Please try again.";
pub const UPLOAD_SUCCEEDED: &str = "Trains successfully added.";
pub const UPLOAD_FAILED: &str = "There was an error in adding trains from the CSV.";
pub const INSERT_FAILED: &str = "Error inserting train data into the database. Ensure that all trains in CSV are not already present.";

/// 针对单条记录的操作
#[derive(Debug, Clone, Copy, PartialEq)]
enum RecordAction {
    Edit,
    Delete,
    Add,
}

impl RecordAction {
    fn done(&self) -> &'static str {
        match self {
            RecordAction::Edit => "updated",
            RecordAction::Delete => "removed",
            RecordAction::Add => "added",
        }
    }

    fn doing(&self) -> &'static str {
        match self {
            RecordAction::Edit => "updating",
            RecordAction::Delete => "removing",
            RecordAction::Add => "adding",
        }
    }
}

pub struct TrainsController<'a, S: TrainStore> {
    request: &'a HttpRequest,
    store: S,
    error_message: Option<String>,
}

impl<'a, S: TrainStore> TrainsController<'a, S> {
    pub fn new(request: &'a HttpRequest, store: S) -> Self {
        Self {
            request,
            store,
            error_message: None,
        }
    }

    /// 处理 CSV 上传。没有文件字段时不产生任何提示。
    fn upload(&mut self) -> Option<String> {
        let request = self.request;
        let file = request.file(FIELD_CSV)?;
        if file.is_empty() {
            self.error_message = Some(NO_FILE_SELECTED.to_string());
            return None;
        }
        if file.content_type() != CSV_CONTENT_TYPE {
            debug!(
                "[ID{}]上传文件类型为{}，拒绝",
                request.id(),
                file.content_type()
            );
            self.error_message = Some(NOT_A_CSV.to_string());
            return None;
        }
        if self.import_csv(file.data()) {
            Some(UPLOAD_SUCCEEDED.to_string())
        } else {
            Some(UPLOAD_FAILED.to_string())
        }
    }

    fn import_csv(&mut self, data: &[u8]) -> bool {
        let id = self.request.id();
        let trains = match TrainsCsvParser::from_bytes(data) {
            Ok(parser) => parser.into_trains(),
            Err(e) => {
                warn!("[ID{}]CSV解析失败：{}", id, e);
                self.error_message = Some(e.to_string());
                return false;
            }
        };
        if !self.store.store_multiple(&trains) {
            self.error_message = Some(INSERT_FAILED.to_string());
            return false;
        }
        info!("[ID{}]从CSV导入了列车数据，共{}条", id, trains.len());
        true
    }

    /// 用表单字段构造一条记录；编辑与删除还需要一个合法的 id
    fn train_from_parameters(&self, with_id: bool) -> Option<Train> {
        let field = |key: &str| self.parameter_str(key).map(|v| v.to_string());
        let train = Train::from_parts(
            field(FIELD_LINE),
            field(FIELD_ROUTE),
            field(FIELD_RUN_NUMBER),
            field(FIELD_OPERATOR_ID),
            None,
        );
        if !with_id {
            return Some(train);
        }
        let id = self.parameter_str(FIELD_ID)?.trim().parse::<i64>().ok()?;
        Some(train.with_id(id))
    }

    fn record_action(&self, action: RecordAction) -> String {
        let run_number = self.parameter_str(FIELD_RUN_NUMBER).unwrap_or_default();
        let succeeded = match self.train_from_parameters(action != RecordAction::Add) {
            Some(train) => match action {
                RecordAction::Edit => self.store.update(&train),
                RecordAction::Delete => self.store.delete(&train),
                RecordAction::Add => self.store.store_single(&train),
            },
            None => {
                warn!("[ID{}]{:?}操作缺少合法的id", self.request.id(), action);
                false
            }
        };
        if succeeded {
            format!("Train {} has been {}", run_number, action.done())
        } else {
            format!(
                "There was an error in {} Train {}.",
                action.doing(),
                run_number
            )
        }
    }
}

impl<'a, S: TrainStore> Controller for TrainsController<'a, S> {
    fn request(&self) -> &HttpRequest {
        self.request
    }

    fn handle_request(&mut self) -> Result<Option<HttpResponse>, Exception> {
        let mut status_message = None;

        if self.request_method() == HttpRequestMethod::Post {
            let submit = self.parameter_str(FIELD_SUBMIT).map(|s| s.to_string());
            if let Some(submit) = submit {
                debug!("[ID{}]表单操作：{}", self.request.id(), submit);
                status_message = match submit.as_str() {
                    "upload" => self.upload(),
                    "edit" => Some(self.record_action(RecordAction::Edit)),
                    "delete" => Some(self.record_action(RecordAction::Delete)),
                    "add" => Some(self.record_action(RecordAction::Add)),
                    _ => None,
                };
            }
        }

        let trains = self.store.all_trains();
        let page = Page::new(PAGE_TITLE, PAGE_DESCRIPTION)
            .with_component(Box::new(TrainsPage::new(
                Box::new(FileUploadForm::new(self.error_message.clone())),
                Box::new(TrainListing::new(trains, status_message)),
            )))
            .with_header(Box::new(Header))
            .with_footer(Box::new(Footer));
        Ok(Some(page.to_http_response()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trains::dao::MockTrainStore;

    fn form_request(body: &str) -> HttpRequest {
        let raw = format!(
            "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        HttpRequest::try_from(raw.as_bytes(), "127.0.0.1:1", 7878, 1).unwrap()
    }

    fn upload_request(file_name: &str, content_type: &str, content: &str) -> HttpRequest {
        let body = [
            "--TrainsBoundary\r\n",
            "Content-Disposition: form-data; name=\"train_csv\"; filename=\"",
            file_name,
            "\"\r\nContent-Type: ",
            content_type,
            "\r\n\r\n",
            content,
            "\r\n--TrainsBoundary\r\n",
            "Content-Disposition: form-data; name=\"submit\"\r\n\r\n",
            "upload\r\n",
            "--TrainsBoundary--\r\n",
        ]
        .concat();
        let raw = format!(
            "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: multipart/form-data; boundary=TrainsBoundary\r\n\r\n{}",
            body
        );
        HttpRequest::try_from(raw.as_bytes(), "127.0.0.1:1", 7878, 1).unwrap()
    }

    fn render(request: &HttpRequest, store: MockTrainStore) -> String {
        let mut controller = TrainsController::new(request, store);
        let response = controller.handle_request().unwrap().unwrap();
        assert_eq!(response.status_code(), 200);
        String::from_utf8(response.body().unwrap().to_vec()).unwrap()
    }

    fn listing_store() -> MockTrainStore {
        let mut store = MockTrainStore::new();
        store
            .expect_all_trains()
            .times(1)
            .returning(|| vec![Train::new("El", "Brown", "E1", "op1").with_id(1)]);
        store
    }

    #[test]
    fn test_get_renders_listing_without_writes() {
        let request =
            HttpRequest::try_from(b"GET /?submit=delete&id=1 HTTP/1.1\r\n\r\n", "", 80, 0).unwrap();
        let html = render(&request, listing_store());
        assert!(html.contains("<title>Train Listing</title>"));
        assert!(html.contains("Lists train data from an uploaded CSV file"));
        assert!(html.contains("/css/trains.css"));
        assert!(html.contains("value=\"E1\""));
    }

    #[test]
    fn test_edit_success() {
        let mut store = listing_store();
        store
            .expect_update()
            .withf(|train| train.id() == Some(4) && train.route() == "Purple")
            .times(1)
            .return_const(true);
        let request =
            form_request("submit=edit&id=4&line=El&route=Purple&run_number=E9&operator_id=op");
        let html = render(&request, store);
        assert!(html.contains("Train E9 has been updated"));
    }

    #[test]
    fn test_delete_failure() {
        let mut store = listing_store();
        store.expect_delete().times(1).return_const(false);
        let request = form_request("submit=delete&id=4&run_number=E9");
        let html = render(&request, store);
        assert!(html.contains("There was an error in removing Train E9."));
    }

    #[test]
    fn test_edit_without_id_does_not_touch_store() {
        let mut store = listing_store();
        store.expect_update().never();
        let request = form_request("submit=edit&id=&run_number=E9");
        let html = render(&request, store);
        assert!(html.contains("There was an error in updating Train E9."));
    }

    #[test]
    fn test_add() {
        let mut store = listing_store();
        store
            .expect_store_single()
            .withf(|train| train.id().is_none() && train.run_number() == "N1")
            .times(1)
            .return_const(true);
        let request = form_request("submit=add&line=Metra&route=UP-N&run_number=N1&operator_id=x");
        let html = render(&request, store);
        assert!(html.contains("Train N1 has been added"));
    }

    #[test]
    fn test_status_message_escaped() {
        let mut store = listing_store();
        store.expect_store_single().return_const(false);
        let request = form_request("submit=add&run_number=%3Cscript%3E");
        let html = render(&request, store);
        assert!(html.contains("There was an error in adding Train &lt;script&gt;."));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_upload_without_file_selected() {
        let mut store = listing_store();
        store.expect_store_multiple().never();
        let request = upload_request("", "application/octet-stream", "");
        let html = render(&request, store);
        assert!(html.contains(NO_FILE_SELECTED));
    }

    #[test]
    fn test_upload_rejects_non_csv() {
        let mut store = listing_store();
        store.expect_store_multiple().never();
        let request = upload_request("trains.txt", "text/plain", "TRAIN_LINE\nEl");
        let html = render(&request, store);
        assert!(html.contains(NOT_A_CSV));
    }

    #[test]
    fn test_upload_success() {
        let mut store = listing_store();
        store
            .expect_store_multiple()
            .withf(|trains| trains.len() == 2 && trains[1].run_number() == "E2")
            .times(1)
            .return_const(true);
        let request = upload_request(
            "trains.csv",
            "text/csv",
            "TRAIN_LINE,ROUTE_NAME,RUN_NUMBER,OPERATOR_ID\r\nEl,Brown,E1,op1\r\nEl,Red,E2,op2",
        );
        let html = render(&request, store);
        assert!(html.contains(UPLOAD_SUCCEEDED));
    }

    #[test]
    fn test_upload_all_duplicates() {
        let mut store = listing_store();
        store.expect_store_multiple().times(1).return_const(false);
        let request = upload_request(
            "trains.csv",
            "text/csv",
            "TRAIN_LINE,ROUTE_NAME,RUN_NUMBER,OPERATOR_ID\nEl,Brown,E1,op1",
        );
        let html = render(&request, store);
        assert!(html.contains(UPLOAD_FAILED));
        assert!(html.contains(INSERT_FAILED));
    }

    #[test]
    fn test_upload_malformed_csv() {
        let mut store = listing_store();
        store.expect_store_multiple().never();
        let request = upload_request(
            "trains.csv",
            "text/csv",
            "TRAIN_LINE,ROUTE_NAME\nEl,Brown,extra",
        );
        let html = render(&request, store);
        assert!(html.contains(UPLOAD_FAILED));
        assert!(html.contains("CSV line 2 does not match the header"));
    }
}
