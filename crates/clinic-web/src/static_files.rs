//! 静态文件服务模块
//!
//! 托管简单的管理界面，作为REST API的可视化入口

use tower_http::services::ServeDir;
use tracing::{error, info};

/// 创建静态文件服务
pub fn create_static_service() -> ServeDir {
    // 首先确保static目录存在
    if let Err(e) = std::fs::create_dir_all("static") {
        error!("Failed to create static directory: {}", e);
    }

    create_default_static_files();

    ServeDir::new("static").append_index_html_on_directories(true)
}

/// 创建默认的静态文件
fn create_default_static_files() {
    if std::path::Path::new("static/index.html").exists() {
        return;
    }

    let index_html = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Clinic Management</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #f4f6f9;
            color: #333;
        }
        .container { max-width: 960px; margin: 0 auto; padding: 30px 20px; }
        .header { text-align: center; margin-bottom: 30px; }
        .header h1 { font-size: 2rem; color: #1d6f63; }
        .cards { display: grid; grid-template-columns: repeat(auto-fit, minmax(280px, 1fr)); gap: 16px; }
        .card { background: white; border-radius: 8px; padding: 20px; box-shadow: 0 2px 8px rgba(0,0,0,0.08); }
        .card h2 { color: #1d6f63; font-size: 1.1rem; margin-bottom: 10px; }
        .endpoint {
            background: #f8f9fa; padding: 6px 10px; border-radius: 4px;
            font-family: 'Courier New', monospace; font-size: 0.85rem;
            margin: 4px 0; border-left: 3px solid #1d6f63;
        }
        .footer { text-align: center; margin-top: 30px; color: #888; font-size: 0.85rem; }
    </style>
</head>
<body>
    <div class="container">
        <header class="header">
            <h1>🏥 Clinic Management</h1>
            <p>门诊排队 · 住院 · 检验 · 收费</p>
        </header>

        <div class="cards">
            <div class="card">
                <h2>认证</h2>
                <div class="endpoint">POST /auth/login</div>
                <div class="endpoint">GET /auth/me</div>
            </div>
            <div class="card">
                <h2>患者与排队</h2>
                <div class="endpoint">POST /api/v1/patients</div>
                <div class="endpoint">POST /api/v1/queue</div>
                <div class="endpoint">POST /api/v1/queue/next?doctor_id=…</div>
                <div class="endpoint">POST /api/v1/queue/:id/complete</div>
            </div>
            <div class="card">
                <h2>住院</h2>
                <div class="endpoint">GET /api/v1/beds</div>
                <div class="endpoint">POST /api/v1/admissions</div>
                <div class="endpoint">POST /api/v1/admissions/:id/discharge</div>
            </div>
            <div class="card">
                <h2>检验与处方</h2>
                <div class="endpoint">POST /api/v1/lab/orders</div>
                <div class="endpoint">POST /api/v1/lab/orders/:id/complete</div>
                <div class="endpoint">POST /api/v1/prescriptions</div>
            </div>
            <div class="card">
                <h2>收费</h2>
                <div class="endpoint">GET /api/v1/invoices?patient_id=…</div>
                <div class="endpoint">POST /api/v1/invoices/:id/payments</div>
            </div>
            <div class="card">
                <h2>系统</h2>
                <div class="endpoint">GET /health</div>
                <div class="endpoint">GET /metrics</div>
                <div class="endpoint">GET /api/v1/overview</div>
            </div>
        </div>

        <footer class="footer">
            <p>Clinic Management System - Built with Rust &amp; Axum</p>
        </footer>
    </div>
</body>
</html>"#;

    if let Err(e) = std::fs::write("static/index.html", index_html) {
        error!("Failed to create index.html: {}", e);
    } else {
        info!("Default static files created");
    }
}
