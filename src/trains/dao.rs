// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # trains 表的存取
//!
//! 单条 SQL 的失败不会向上抛出异常：错误被记录到日志，并归约为 `false`。

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, warn};
use rusqlite::{params, Connection, Row};

use super::model::Train;
use crate::exception::Exception;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS trains (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    line        TEXT,
    route       TEXT,
    run_number  TEXT UNIQUE,
    operator_id TEXT
)";
const SELECT_BY_ID: &str =
    "SELECT id, line, route, run_number, operator_id FROM trains WHERE id = ?1";
const SELECT_ALL: &str =
    "SELECT id, line, route, run_number, operator_id FROM trains ORDER BY run_number ASC";
const INSERT: &str =
    "INSERT INTO trains (line, route, run_number, operator_id) VALUES (?1, ?2, ?3, ?4)";
const UPDATE: &str =
    "UPDATE trains SET line = ?1, route = ?2, run_number = ?3, operator_id = ?4 WHERE id = ?5";
const DELETE: &str = "DELETE FROM trains WHERE id = ?1";

/// 列车记录的持久化接口
#[cfg_attr(test, mockall::automock)]
pub trait TrainStore {
    /// 按 id 查找一条记录
    fn train_by_id(&self, id: i64) -> Option<Train>;

    /// 全部记录，按车次升序
    fn all_trains(&self) -> Vec<Train>;

    fn store_single(&self, train: &Train) -> bool;

    /// 批量写入，重复的记录会被跳过。只要有一条记录写入成功就返回 `true`。
    fn store_multiple(&self, trains: &[Train]) -> bool;

    fn update(&self, train: &Train) -> bool;

    fn delete(&self, train: &Train) -> bool;
}

/// 基于 SQLite 的实现。连接在进程启动时建立一次，所有请求共享。
#[derive(Clone)]
pub struct TrainsDao {
    connection: Arc<Mutex<Connection>>,
}

impl TrainsDao {
    /// 打开（或创建）数据库文件并确保 trains 表存在
    pub fn connect(database: &str) -> Result<Self, Exception> {
        let connection = match Connection::open(database) {
            Ok(connection) => connection,
            Err(e) => {
                error!("无法打开数据库{}：{}", database, e);
                return Err(Exception::DatabaseUnavailable(e.to_string()));
            }
        };
        if let Err(e) = connection.execute(CREATE_TABLE, []) {
            error!("无法创建trains表：{}", e);
            return Err(Exception::DatabaseUnavailable(e.to_string()));
        }
        debug!("数据库{}已连接", database);
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.connection.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("数据库锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }
}

fn row_to_train(row: &Row) -> rusqlite::Result<Train> {
    Ok(Train::from_parts(
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(0)?,
    ))
}

impl TrainStore for TrainsDao {
    fn train_by_id(&self, id: i64) -> Option<Train> {
        let connection = self.lock();
        match connection.query_row(SELECT_BY_ID, params![id], row_to_train) {
            Ok(train) => Some(train),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                error!("查询列车{}失败：{}", id, e);
                None
            }
        }
    }

    fn all_trains(&self) -> Vec<Train> {
        let connection = self.lock();
        let mut statement = match connection.prepare(SELECT_ALL) {
            Ok(statement) => statement,
            Err(e) => {
                error!("查询全部列车失败：{}", e);
                return Vec::new();
            }
        };
        let rows = match statement.query_map([], row_to_train) {
            Ok(rows) => rows,
            Err(e) => {
                error!("查询全部列车失败：{}", e);
                return Vec::new();
            }
        };
        let trains = rows
            .filter_map(|row| match row {
                Ok(train) => Some(train),
                Err(e) => {
                    error!("读取列车记录失败：{}", e);
                    None
                }
            })
            .collect();
        trains
    }

    fn store_single(&self, train: &Train) -> bool {
        let connection = self.lock();
        match connection.execute(
            INSERT,
            params![
                train.line(),
                train.route(),
                train.run_number(),
                train.operator_id()
            ],
        ) {
            Ok(_) => true,
            Err(e) => {
                error!("写入列车{}失败：{}", train.run_number(), e);
                false
            }
        }
    }

    fn store_multiple(&self, trains: &[Train]) -> bool {
        let connection = self.lock();
        let mut statement = match connection.prepare(INSERT) {
            Ok(statement) => statement,
            Err(e) => {
                error!("批量写入列车失败：{}", e);
                return false;
            }
        };
        let mut stored = 0;
        for train in trains {
            match statement.execute(params![
                train.line(),
                train.route(),
                train.run_number(),
                train.operator_id()
            ]) {
                Ok(_) => stored += 1,
                // 多数情况下是车次重复
                Err(e) => debug!("跳过列车{}：{}", train.run_number(), e),
            }
        }
        debug!("批量写入完成：{}/{}", stored, trains.len());
        stored > 0
    }

    fn update(&self, train: &Train) -> bool {
        let connection = self.lock();
        match connection.execute(
            UPDATE,
            params![
                train.line(),
                train.route(),
                train.run_number(),
                train.operator_id(),
                train.id()
            ],
        ) {
            Ok(_) => true,
            Err(e) => {
                error!("更新列车{:?}失败：{}", train.id(), e);
                false
            }
        }
    }

    fn delete(&self, train: &Train) -> bool {
        let connection = self.lock();
        match connection.execute(DELETE, params![train.id()]) {
            Ok(_) => true,
            Err(e) => {
                error!("删除列车{:?}失败：{}", train.id(), e);
                false
            }
        }
    }
}
