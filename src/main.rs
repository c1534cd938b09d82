// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 列车列表站点
//!
//! 基于 Tokio 运行时的多线程服务端。每个连接由一个任务从头到尾处理：
//! 读取并解析请求，路由到静态资源或列车控制器，协商压缩后写回响应。

use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    net::{TcpListener, TcpStream},
    runtime::Builder,
    time,
};

use trainlist::{
    assets::Assets,
    config::Config,
    controller::{Controller, HTTP_PERMANENT_REDIRECT},
    exception::Exception,
    param::{HttpRequestMethod, ALLOWED_METHODS},
    request::{content_length, find_head_end, HttpRequest},
    response::HttpResponse,
    trains::{TrainsController, TrainsDao},
    url::{Params, Url},
};

/// 旧站点的入口地址，永久重定向到 `/`
const LEGACY_INDEX: &str = "/index.php";

fn main() {
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
    }

    let config = Config::from_toml("config/development.toml");
    info!("配置文件已载入");
    info!("www root: {}", config.www_root());

    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建运行时：{}", e);
            return;
        }
    };
    runtime.block_on(serve(config));
}

async fn serve(config: Config) {
    // 数据库连接在启动时建立一次，之后由所有请求共享
    let dao = match TrainsDao::connect(config.database()) {
        Ok(dao) => dao,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };
    info!("数据库{}已就绪", config.database());

    let assets = Arc::new(Assets::new(
        config.www_root(),
        config.asset_cache_size(),
        config.asset_max_age(),
    ));

    let port = config.port();
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}:{}上监听Socket连接", address, port);
    let listener = match TcpListener::bind(SocketAddrV4::new(address, port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", port, e);
            return;
        }
    };
    info!("端口{}绑定完成", port);

    let config = Arc::new(config);
    let mut id: u128 = 0;
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(connection) => connection,
            Err(e) => {
                error!("接受连接失败：{}", e);
                continue;
            }
        };
        debug!("[ID{}]TCP连接已建立：{}", id, addr);

        let config = Arc::clone(&config);
        let assets = Arc::clone(&assets);
        let dao = dao.clone();
        tokio::spawn(async move {
            handle_connection(stream, addr, id, config, assets, dao).await;
        });
        id += 1;
    }
}

/// # 连接处理器
///
/// 读取请求、执行路由、构建并发送响应。每个连接只处理一个请求。
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    id: u128,
    config: Arc<Config>,
    assets: Arc<Assets>,
    dao: TrainsDao,
) {
    let start_time = Instant::now();
    let timeout = Duration::from_millis(config.read_timeout_ms());

    let buffer = match time::timeout(timeout, read_request(&mut stream, config.max_body_size(), id)).await
    {
        Ok(Ok(Some(buffer))) => buffer,
        Ok(Ok(None)) => return,
        Ok(Err(Exception::PayloadTooLarge)) => {
            warn!("[ID{}]请求体过大，返回413", id);
            send_bare(&mut stream, HttpResponse::from_status_code(413, None), id).await;
            return;
        }
        Ok(Err(e)) => {
            warn!("[ID{}]读取HTTP请求失败: {}，返回400", id, e);
            send_bare(&mut stream, HttpResponse::from_status_code(400, None), id).await;
            return;
        }
        Err(_) => {
            warn!("[ID{}]读取HTTP请求超时（{}ms）", id, config.read_timeout_ms());
            send_bare(&mut stream, HttpResponse::from_status_code(408, None), id).await;
            return;
        }
    };
    debug!("[ID{}]HTTP请求接收完毕，{} bytes", id, buffer.len());

    let request = match HttpRequest::try_from(&buffer, &addr.to_string(), config.port(), id) {
        Ok(request) => request,
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败: {}，返回400", id, e);
            send_bare(&mut stream, HttpResponse::from_status_code(400, None), id).await;
            return;
        }
    };
    debug!("[ID{}]成功解析HTTP请求", id);

    let (request, mut response) = dispatch(request, assets, dao).await;
    response.negotiate(&request);
    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    // 日志中不出现任何凭据
    let logged = request.redact_credentials();
    if !logged.body().is_empty() {
        debug!("[ID{}]请求体：{}", id, logged.body());
    }
    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}, {}, {}ms",
        id,
        logged.client_address(),
        logged.version(),
        logged.method(),
        logged.path(),
        response.status_code(),
        response.information(),
        logged.user_agent(),
        start_time.elapsed().as_millis(),
    );

    if let Err(e) = response.send(&mut stream, id).await {
        error!("[ID{}]发送响应失败: {}", id, e);
    }
}

/// 请求还未成功解析时直接发送的响应
async fn send_bare(stream: &mut TcpStream, response: HttpResponse, id: u128) {
    if let Err(e) = response.send(stream, id).await {
        error!("[ID{}]发送响应失败: {}", id, e);
    }
}

/// 在阻塞线程池中执行路由。控制器会同步访问 SQLite，静态资源会读磁盘，
/// 二者都不应占用运行时的工作线程。
async fn dispatch(
    request: HttpRequest,
    assets: Arc<Assets>,
    dao: TrainsDao,
) -> (HttpRequest, HttpResponse) {
    let id = request.id();
    let fallback = request.clone();
    match tokio::task::spawn_blocking(move || {
        let response = route(&request, &assets, dao);
        (request, response)
    })
    .await
    {
        Ok(routed) => routed,
        Err(e) => {
            error!("[ID{}]路由任务异常终止: {}", id, e);
            (fallback, HttpResponse::from_status_code(500, None))
        }
    }
}

/// 读取一个完整的请求：先读到 `\r\n\r\n` 为止的请求头，再按 `Content-Length` 读取请求体。
///
/// 对端在发送任何数据之前关闭连接时返回 `Ok(None)`。
async fn read_request<R>(
    stream: &mut R,
    max_body_size: usize,
    id: u128,
) -> Result<Option<Vec<u8>>, Exception>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = vec![0u8; 1024];

    let head_end = loop {
        if let Some(end) = find_head_end(&buffer) {
            break end;
        }
        if buffer.len() > max_body_size {
            return Err(Exception::PayloadTooLarge);
        }
        match stream.read(&mut chunk).await {
            Ok(0) if buffer.is_empty() => return Ok(None),
            Ok(0) => return Err(Exception::MalformedRequest),
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            Err(e) => {
                error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
                return Ok(None);
            }
        }
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]);
    let length = content_length(&head).unwrap_or(0);
    if length > max_body_size {
        return Err(Exception::PayloadTooLarge);
    }
    let total = head_end + 4 + length;
    while buffer.len() < total {
        match stream.read(&mut chunk).await {
            Ok(0) => return Err(Exception::MalformedRequest),
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            Err(e) => {
                error!("[ID{}]读取请求体时遇到错误: {}", id, e);
                return Ok(None);
            }
        }
    }
    buffer.truncate(total);
    Ok(Some(buffer))
}

/// # 路由
///
/// 1. `OPTIONS` -> 204，附带 `Allow`。
/// 2. 不在允许列表中的方法 -> 405。
/// 3. `/` -> 列车控制器。
/// 4. `/index.php` -> 永久重定向到 `/`。
/// 5. `www_root` 下的文件 -> 静态资源，仅限 `GET`/`HEAD`。
/// 6. 其余 -> 404。
fn route(request: &HttpRequest, assets: &Assets, dao: TrainsDao) -> HttpResponse {
    let id = request.id();
    let method = request.method();
    let path = request.url().path();
    let full_path = path.full_path(false);
    debug!("[ID{}]路由匹配开始: {} {}", id, method, full_path);

    if method == HttpRequestMethod::Options {
        return HttpResponse::options();
    }
    if !ALLOWED_METHODS.contains(&method) {
        warn!("[ID{}]不支持的请求方法{}，返回405", id, method);
        return HttpResponse::from_status_code(405, None);
    }

    if full_path == "/" {
        let mut controller = TrainsController::new(request, dao);
        return match controller.handle_request() {
            Ok(Some(response)) => response,
            Ok(None) => HttpResponse::from_status_code(404, None),
            Err(e) => {
                error!("[ID{}]渲染页面失败: {}", id, e);
                HttpResponse::from_status_code(500, None)
            }
        };
    }

    if full_path == LEGACY_INDEX {
        let destination = Url::from_request(request)
            .with_path("/")
            .with_params(Params::new());
        return HttpResponse::redirect(&destination, HTTP_PERMANENT_REDIRECT);
    }

    match assets.resolve(path) {
        Ok(_) if method == HttpRequestMethod::Post => HttpResponse::from_status_code(405, None),
        Ok(_) => match assets.serve(path, id) {
            Ok(response) => response,
            Err(e) => {
                error!("[ID{}]读取静态资源失败: {}", id, e);
                HttpResponse::from_status_code(500, None)
            }
        },
        Err(Exception::InvalidPath) => {
            warn!("[ID{}]请求的路径：{} 包含非法字符，返回400", id, full_path);
            HttpResponse::from_status_code(400, None)
        }
        Err(_) => {
            warn!("[ID{}]请求的路径：{} 不存在，返回404", id, full_path);
            HttpResponse::from_status_code(404, None)
        }
    }
}
