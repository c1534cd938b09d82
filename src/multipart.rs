// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # multipart/form-data 解析
//!
//! 只处理浏览器表单提交会产生的子集：每个分段带有 `Content-Disposition: form-data`，
//! 有 `filename` 的分段视为上传文件，其余视为普通文本字段。

use crate::exception::Exception;
use crate::url::{ParamValue, Params, LIST_KEY_SUFFIX};

const HEADER_END: &[u8] = b"\r\n\r\n";

/// 表单中上传的一个文件
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    field_name: String,
    file_name: String,
    content_type: String,
    data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(field_name: &str, file_name: &str, content_type: &str, data: Vec<u8>) -> Self {
        Self {
            field_name: field_name.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            data,
        }
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// 客户端提供的原始文件名
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// 客户端声明的 MIME 类型
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 浏览器在未选择文件时仍会提交一个文件名为空、内容为空的分段
    pub fn is_empty(&self) -> bool {
        self.file_name.is_empty() && self.data.is_empty()
    }
}

/// 从 `Content-Type` 头中取出 boundary 参数
pub fn boundary_of(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(|s| s.trim())
        .find_map(|s| {
            let (key, value) = s.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("boundary") {
                Some(value.trim().trim_matches('"').to_string())
            } else {
                None
            }
        })
        .filter(|b| !b.is_empty())
}

/// 解析请求体，返回文本字段与上传文件
pub fn parse_multipart(
    body: &[u8],
    boundary: &str,
) -> Result<(Params, Vec<UploadedFile>), Exception> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut params = Params::new();
    let mut files = Vec::new();

    let mut cursor = find(body, &delimiter, 0).ok_or(Exception::MalformedRequest)?;
    loop {
        let start = cursor + delimiter.len();
        // 结束分隔符 `--boundary--`
        if body[start..].starts_with(b"--") {
            break;
        }
        let next = match find(body, &delimiter, start) {
            Some(next) => next,
            None => return Err(Exception::MalformedRequest),
        };
        let part = strip_crlf(&body[start..next]);
        if let Some(split) = find(part, HEADER_END, 0) {
            let head = String::from_utf8_lossy(&part[..split]);
            let content = &part[split + HEADER_END.len()..];
            read_part(&head, content, &mut params, &mut files);
        }
        cursor = next;
    }
    Ok((params, files))
}

fn read_part(head: &str, content: &[u8], params: &mut Params, files: &mut Vec<UploadedFile>) {
    let mut name = None;
    let mut file_name = None;
    let mut content_type = String::new();
    for line in head.split("\r\n") {
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let field = field.trim();
        if field.eq_ignore_ascii_case("Content-Disposition") {
            name = disposition_param(value, "name");
            file_name = disposition_param(value, "filename");
        } else if field.eq_ignore_ascii_case("Content-Type") {
            content_type = value.trim().to_string();
        }
    }
    let Some(name) = name else {
        return;
    };
    match file_name {
        Some(file_name) => files.push(UploadedFile::new(
            &name,
            &file_name,
            &content_type,
            content.to_vec(),
        )),
        None => {
            let value = String::from_utf8_lossy(content).into_owned();
            match name.strip_suffix(LIST_KEY_SUFFIX) {
                Some(key) => params.append(key, value),
                None => params.set(&name, ParamValue::Single(value)),
            }
        }
    }
}

fn disposition_param(disposition: &str, key: &str) -> Option<String> {
    disposition.split(';').map(|s| s.trim()).find_map(|s| {
        let (k, v) = s.split_once('=')?;
        if k.trim().eq_ignore_ascii_case(key) {
            Some(v.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

/// 去掉分段首尾各一个 CRLF
fn strip_crlf(part: &[u8]) -> &[u8] {
    let part = part.strip_prefix(b"\r\n").unwrap_or(part);
    part.strip_suffix(b"\r\n").unwrap_or(part)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
