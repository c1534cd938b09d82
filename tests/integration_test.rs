// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const ADDRESS: &str = "127.0.0.1:7878";

/// 发送原始请求并读取完整响应（服务端每个连接只处理一个请求，读到 EOF 为止）
async fn send_request(request: &[u8]) -> Result<String, String> {
    let mut stream = TcpStream::connect(ADDRESS)
        .await
        .map_err(|e| e.to_string())?;
    stream.write_all(request).await.map_err(|e| e.to_string())?;

    let mut buffer = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buffer))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

fn parse_response(response: &str) -> (u16, Vec<(String, String)>, String) {
    let lines: Vec<&str> = response.split("\r\n").collect();

    // 解析状态行
    let status_line = lines[0];
    let status_code = status_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("0")
        .parse::<u16>()
        .unwrap_or(0);

    // 解析头部
    let mut headers = Vec::new();
    let mut i = 1;
    while i < lines.len() && !lines[i].is_empty() {
        if let Some((key, value)) = lines[i].split_once(": ") {
            headers.push((key.to_string(), value.to_string()));
        }
        i += 1;
    }

    // 解析主体
    let body = if i + 1 < lines.len() {
        lines[i + 1..].join("\r\n")
    } else {
        String::new()
    };

    (status_code, headers, body)
}

fn header<'a>(headers: &'a [(String, String)], field: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(f, _)| f.eq_ignore_ascii_case(field))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    #[ignore] // 需要服务器运行时才能通过
    async fn test_get_listing_page() {
        let response = send_request(b"GET / HTTP/1.1\r\nHost: localhost:7878\r\n\r\n")
            .await
            .unwrap();
        let (status_code, headers, body) = parse_response(&response);
        assert_eq!(status_code, 200);
        assert!(header(&headers, "Content-Length").is_some());
        assert!(header(&headers, "Date").is_some());
        assert_eq!(header(&headers, "Server"), Some("trainlist"));
        assert_eq!(
            header(&headers, "Cache-Control"),
            Some("no-cache, no-store, must-revalidate, max-age=0")
        );
        assert!(body.contains("<title>Train Listing</title>"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_head_request() {
        let response = send_request(b"HEAD / HTTP/1.1\r\nHost: localhost:7878\r\n\r\n")
            .await
            .unwrap();
        let (status_code, headers, body) = parse_response(&response);
        assert_eq!(status_code, 200);
        // HEAD 请求不应该有响应体，但应该有 Content-Length 头
        assert!(body.is_empty());
        assert_ne!(header(&headers, "Content-Length"), Some("0"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_options_request() {
        let response = send_request(b"OPTIONS * HTTP/1.1\r\nHost: localhost:7878\r\n\r\n")
            .await
            .unwrap();
        let (status_code, headers, _body) = parse_response(&response);
        assert_eq!(status_code, 204);
        let allow = header(&headers, "Allow").unwrap();
        assert!(allow.contains("GET"));
        assert!(allow.contains("POST"));
        assert!(allow.contains("OPTIONS"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_stylesheet_served() {
        let response = send_request(b"GET /css/trains.css HTTP/1.1\r\nHost: localhost:7878\r\n\r\n")
            .await
            .unwrap();
        let (status_code, headers, body) = parse_response(&response);
        assert_eq!(status_code, 200);
        assert_eq!(header(&headers, "Content-Type"), Some("text/css;charset=utf-8"));
        assert!(header(&headers, "Cache-Control").unwrap().starts_with("max-age="));
        assert!(body.contains(".container"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_404_and_405() {
        let response = send_request(b"GET /nonexistent-file-12345.html HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(parse_response(&response).0, 404);

        let response = send_request(b"PUT / HTTP/1.1\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap();
        let (status_code, headers, _body) = parse_response(&response);
        assert_eq!(status_code, 405);
        assert!(header(&headers, "Allow").is_some());
    }

    #[tokio::test]
    #[ignore]
    async fn test_legacy_index_redirect() {
        let response = send_request(b"GET /index.php HTTP/1.1\r\nHost: localhost:7878\r\n\r\n")
            .await
            .unwrap();
        let (status_code, headers, _body) = parse_response(&response);
        assert_eq!(status_code, 301);
        assert_eq!(header(&headers, "Location"), Some("http://localhost:7878/"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_compression_support() {
        let response = send_request(
            b"GET / HTTP/1.1\r\nHost: localhost:7878\r\nAccept-Encoding: gzip, deflate, br\r\n\r\n",
        )
        .await
        .unwrap();
        let (_status_code, headers, _body) = parse_response(&response);
        assert_eq!(header(&headers, "Content-Encoding"), Some("gzip"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_add_train_form() {
        let body = "submit=add&line=El&route=Pink&run_number=IT-9001&operator_id=it";
        let request = format!(
            "POST / HTTP/1.1\r\nHost: localhost:7878\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let response = send_request(request.as_bytes()).await.unwrap();
        let (status_code, _headers, body) = parse_response(&response);
        assert_eq!(status_code, 200);
        assert!(body.contains("IT-9001"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_concurrent_requests() {
        let mut handles = vec![];

        for _ in 0..10 {
            let handle = tokio::spawn(async {
                send_request(b"GET / HTTP/1.1\r\nHost: localhost:7878\r\n\r\n").await
            });
            handles.push(handle);
        }

        let mut success_count = 0;
        for handle in handles {
            if let Ok(Ok(response)) = handle.await {
                if parse_response(&response).0 == 200 {
                    success_count += 1;
                }
            }
        }

        assert_eq!(success_count, 10, "并发请求成功数: {}/10", success_count);
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_parse_response_basic() {
        let response = "HTTP/1.1 200 OK\r\nContent-Length: 10\r\nServer: test\r\n\r\nHello";
        let (status_code, headers, body) = parse_response(response);

        assert_eq!(status_code, 200);
        assert_eq!(headers.len(), 2);
        assert_eq!(body, "Hello");
    }

    #[test]
    fn test_parse_response_404() {
        let response = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";
        let (status_code, headers, body) = parse_response(response);

        assert_eq!(status_code, 404);
        assert_eq!(headers.len(), 1);
        assert!(body.is_empty());
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let response = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nServer: trainlist\r\n\r\nHello";
        let (_status_code, headers, _body) = parse_response(response);
        assert_eq!(header(&headers, "content-type"), Some("text/html"));
        assert_eq!(header(&headers, "SERVER"), Some("trainlist"));
        assert_eq!(header(&headers, "Location"), None);
    }
}
