// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 列车 CSV 解析
//!
//! 第一行是表头，其余每行是一条记录。单元格两端的空白会被去除，空行会被跳过。
//! 支持用双引号包裹含逗号的单元格，引号内的 `""` 表示一个双引号。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, error};

use super::model::Train;
use crate::exception::Exception;

pub const LINE_HEADER: &str = "TRAIN_LINE";
pub const ROUTE_HEADER: &str = "ROUTE_NAME";
pub const RUN_HEADER: &str = "RUN_NUMBER";
pub const OPERATOR_HEADER: &str = "OPERATOR_ID";

/// 将 CSV 内容转换为一组 `Train`
#[derive(Debug, Clone)]
pub struct TrainsCsvParser {
    trains: Vec<Train>,
}

impl TrainsCsvParser {
    /// 从磁盘上的 CSV 文件解析，文件不存在时返回 `CsvFileNotFound`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Exception> {
        let path = path.as_ref();
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                error!("无法读取CSV文件{}：{}", path.display(), e);
                return Err(Exception::CsvFileNotFound(path.display().to_string()));
            }
        };
        Self::from_bytes(&content)
    }

    /// 从上传的文件内容解析
    pub fn from_bytes(data: &[u8]) -> Result<Self, Exception> {
        let text = String::from_utf8_lossy(data);
        let trains = parse_csv(&text)?
            .into_iter()
            .map(|mut row| {
                Train::from_parts(
                    row.remove(LINE_HEADER),
                    row.remove(ROUTE_HEADER),
                    row.remove(RUN_HEADER),
                    row.remove(OPERATOR_HEADER),
                    None,
                )
            })
            .collect::<Vec<_>>();
        debug!("CSV解析完成，共{}条记录", trains.len());
        Ok(Self { trains })
    }

    pub fn trains(&self) -> &[Train] {
        &self.trains
    }

    pub fn into_trains(self) -> Vec<Train> {
        self.trains
    }

    pub fn len(&self) -> usize {
        self.trains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }
}

/// 把 CSV 文本解析为“表头 → 单元格”的映射列表。
///
/// 列数与表头不一致的行返回 `MalformedCsv(行号)`，行号从 1 开始并包含表头。
pub fn parse_csv(text: &str) -> Result<Vec<HashMap<String, String>>, Exception> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let header = match lines.next() {
        Some((_, line)) => split_record(line),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for (index, line) in lines {
        let cells = split_record(line);
        if cells.len() != header.len() {
            error!(
                "CSV第{}行有{}列，表头有{}列",
                index + 1,
                cells.len(),
                header.len()
            );
            return Err(Exception::MalformedCsv(index + 1));
        }
        rows.push(header.iter().cloned().zip(cells).collect());
    }
    Ok(rows)
}

/// 拆分一行记录并去除每个单元格两端的空白
fn split_record(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if cell.trim().is_empty() => {
                cell.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => {
                cells.push(cell.trim().to_string());
                cell.clear();
            }
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}
