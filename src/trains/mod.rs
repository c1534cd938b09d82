// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 列车列表站点
//!
//! 模型、CSV 导入、SQLite 存取、视图组件与控制器。

pub mod controller;
pub mod csv;
pub mod dao;
pub mod model;
pub mod view;

pub use controller::TrainsController;
pub use csv::TrainsCsvParser;
pub use dao::{TrainStore, TrainsDao};
pub use model::Train;
