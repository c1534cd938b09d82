// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 列车页面的视图组件
//!
//! 所有来自用户或数据库的文本都在输出时转义。

use super::model::Train;
use crate::component::{Component, ComponentAggregation, Container};
use crate::util::escape_html;

pub const STYLESHEET: &str = "/css/trains.css";

/// 表单提交的列车字段名
pub const FIELD_ID: &str = "id";
pub const FIELD_LINE: &str = "line";
pub const FIELD_ROUTE: &str = "route";
pub const FIELD_RUN_NUMBER: &str = "run_number";
pub const FIELD_OPERATOR_ID: &str = "operator_id";
/// 上传表单中 CSV 文件字段的名称
pub const FIELD_CSV: &str = "train_csv";
pub const FIELD_SUBMIT: &str = "submit";

pub struct Header;

impl Component for Header {
    fn render(&self) -> String {
        r#"<header>
<div class="container" style="text-align: center">
<a href="/"><h1>Welcome to the Train Listing Parser</h1></a>
</div>
</header>
"#
        .to_string()
    }

    fn dependencies(&self) -> Vec<String> {
        vec![STYLESHEET.to_string()]
    }
}

pub struct Footer;

impl Component for Footer {
    fn render(&self) -> String {
        r#"<footer>
<div class="container" style="text-align: center">
<p>&copy; 2022 James Knox Polk. For Consideration Only.</p>
</div>
</footer>
"#
        .to_string()
    }
}

/// CSV 上传表单，可附带一条上传错误提示
pub struct FileUploadForm {
    error_message: Option<String>,
}

impl FileUploadForm {
    pub fn new(error_message: Option<String>) -> Self {
        Self { error_message }
    }
}

impl Component for FileUploadForm {
    fn render(&self) -> String {
        let mut html = centered_row("<p>Please select a CSV file to add trains to the listing</p>");
        if let Some(message) = &self.error_message {
            html.push_str(&centered_row(&format!(
                "<p style=\"color: darkred\">{}</p>",
                escape_html(message)
            )));
        }
        html.push_str(&centered_row(&format!(
            "<form action=\"\" method=\"post\" enctype=\"multipart/form-data\">\
<input type=\"file\" name=\"{}\" value=\"\" />\
<button type=\"submit\" name=\"{}\" value=\"upload\">Upload</button></form>",
            FIELD_CSV, FIELD_SUBMIT
        )));
        html
    }
}

/// 列车列表。每一行都是一个可编辑、可删除的表单，末尾附带一行新增表单。
pub struct TrainListing {
    trains: Vec<Train>,
    status_message: Option<String>,
}

impl TrainListing {
    pub fn new(trains: Vec<Train>, status_message: Option<String>) -> Self {
        Self {
            trains,
            status_message,
        }
    }
}

impl Component for TrainListing {
    fn render(&self) -> String {
        let mut html = String::new();
        if self.trains.is_empty() {
            html.push_str(&centered_row(
                "<p>There is currently no train information to display. Please Upload a CSV File above, or manually enter the information below.</p>",
            ));
        } else if let Some(message) = &self.status_message {
            html.push_str(&centered_row(&format!("<p>{}</p>", escape_html(message))));
        }

        let mut table = String::from(
            "<table class=\"table\">\n<thead>\n<tr>\
<th>Train Line</th><th>Route</th><th>Run Number</th><th>Operator ID</th>\
</tr>\n</thead>\n",
        );
        for train in &self.trains {
            table.push_str(&train_row(train));
        }
        table.push_str(&add_row());
        table.push_str("</table>");
        html.push_str(&centered_row(&table));
        html
    }

    /// 列表在每次增删改之后都会变化
    fn cache_lifetime(&self) -> i64 {
        0
    }
}

/// 上传表单与列车列表，外面包一层 `<div class="container">`
pub struct TrainsPage {
    inner: Container,
}

impl TrainsPage {
    pub fn new(upload_form: Box<dyn Component>, train_listing: Box<dyn Component>) -> Self {
        Self {
            inner: Container::wrapped("<div class=\"container\">\n", "</div>\n")
                .with_component(upload_form)
                .with_component(train_listing),
        }
    }
}

impl Component for TrainsPage {
    fn render(&self) -> String {
        self.inner.render()
    }

    fn dependencies(&self) -> Vec<String> {
        self.inner.aggregated_dependencies()
    }

    fn cache_lifetime(&self) -> i64 {
        self.inner.minimum_lifetime()
    }
}

fn centered_row(content: &str) -> String {
    format!(
        "<div class=\"row\">\n<div class=\"column\" style=\"text-align: center\">\n{}\n</div>\n</div>\n",
        content
    )
}

fn text_input(name: &str, value: &str) -> String {
    format!(
        "<td><input type=\"text\" name=\"{}\" value=\"{}\"/></td>",
        name,
        escape_html(value)
    )
}

fn train_row(train: &Train) -> String {
    let id = train.id().map(|id| id.to_string()).unwrap_or_default();
    format!(
        "<form action=\"\" method=\"post\" enctype=\"multipart/form-data\">\n<tr>\
<input type=\"hidden\" name=\"{}\" value=\"{}\"/>{}{}{}{}\
<td><button type=\"submit\" name=\"{}\" value=\"edit\">Edit</button></td>\
<td><button type=\"submit\" name=\"{}\" value=\"delete\">Delete</button></td>\
</tr>\n</form>\n",
        FIELD_ID,
        id,
        text_input(FIELD_LINE, train.line()),
        text_input(FIELD_ROUTE, train.route()),
        text_input(FIELD_RUN_NUMBER, train.run_number()),
        text_input(FIELD_OPERATOR_ID, train.operator_id()),
        FIELD_SUBMIT,
        FIELD_SUBMIT,
    )
}

fn add_row() -> String {
    let placeholder = |name: &str, label: &str| {
        format!(
            "<td><input type=\"text\" name=\"{}\" placeholder=\"{}\"/></td>",
            name, label
        )
    };
    format!(
        "<form action=\"\" method=\"post\" enctype=\"multipart/form-data\">\n<tr>\
<input type=\"hidden\" name=\"{}\" value=\"\"/>{}{}{}{}\
<td><button type=\"submit\" name=\"{}\" value=\"add\">Add Train</button></td>\
</tr>\n</form>\n",
        FIELD_ID,
        placeholder(FIELD_LINE, "Train Line"),
        placeholder(FIELD_ROUTE, "Route"),
        placeholder(FIELD_RUN_NUMBER, "Run Number"),
        placeholder(FIELD_OPERATOR_ID, "Operator ID"),
        FIELD_SUBMIT,
    )
}
