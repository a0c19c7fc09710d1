//! 诊所服务器主程序

mod bot;
mod jobs;

use anyhow::Result;
use clap::Parser;
use clinic_admin::{ConfigManager, AuditTrail, ClinicMonitor, Scheduler};
use clinic_database::{DatabasePool, DatabaseQueries};
use clinic_integration::webhook::WebhookManager;
use clinic_integration::{TelegramBot, TelegramConfig, TelegramNotifier};
use clinic_web::auth::AuthService;
use clinic_web::{AppState, WebServer};
use clinic_workflow::routing::DoctorProfile;
use clinic_workflow::ClinicEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// 诊所服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(about = "诊所管理信息系统服务器")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "clinic.toml")]
    config: String,

    /// 监听端口（覆盖配置文件）
    #[arg(short, long)]
    port: Option<u16>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .init();

    info!("启动诊所服务器...");

    // 加载配置
    let config_manager = ConfigManager::new(&args.config)?;
    let config = config_manager.get_config().await;

    let port = args.port.unwrap_or(config.server.port);
    info!("诊所服务器配置:");
    info!("  名称: {}", config.server.name);
    info!("  监听: {}:{}", config.server.host, port);
    info!("  数据库: {}", config.database.connection_string);

    // 连接数据库
    let db = Arc::new(
        DatabasePool::connect(
            &config.database.connection_string,
            config.database.max_connections,
        )
        .await?,
    );
    if config.database.create_tables {
        DatabaseQueries::new(&db).create_tables().await?;
    }

    // 构建工作流引擎：床位来自配置，医生来自员工表
    let mut engine = ClinicEngine::default();
    for ward in &config.billing.wards {
        for number in 1..=ward.beds {
            engine
                .admissions_mut()
                .register_bed(&ward.name, number, ward.daily_rate)?;
        }
    }

    let doctors = DatabaseQueries::new(&db).list_staff_by_role("doctor").await?;
    for doctor in doctors {
        match doctor.specialty {
            Some(specialty) => {
                engine.roster_mut().add_doctor(DoctorProfile {
                    id: doctor.id,
                    name: doctor.full_name,
                    specialty,
                    max_workload: 10,
                    is_available: doctor.is_active,
                });
            }
            None => warn!("Doctor {} has no specialty, skipping roster", doctor.username),
        }
    }
    let engine = Arc::new(RwLock::new(engine));

    // 认证与运维组件
    let auth = Arc::new(AuthService::new());
    auth.init_default_users().await;
    let monitor = Arc::new(ClinicMonitor::new()?);
    let audit = Arc::new(AuditTrail::new(config.logging.audit_capacity));
    let events = Arc::new(WebhookManager::new());

    // Telegram
    let telegram_config = TelegramConfig {
        bot_token: config.telegram.bot_token.clone(),
        api_base: config.telegram.api_base.clone(),
        poll_timeout_secs: config.telegram.poll_timeout_secs,
    };
    let notifier = config
        .telegram
        .enabled
        .then(|| TelegramNotifier::new(&telegram_config));

    if config.telegram.enabled {
        let backend = Arc::new(bot::EngineBotBackend::new(engine.clone(), db.clone()));
        let telegram_bot = TelegramBot::new(&telegram_config, backend);
        tokio::spawn(telegram_bot.run());
        info!("Telegram bot enabled");
    }

    // 周期任务
    if config.scheduler.enabled {
        let mut scheduler = Scheduler::new();
        scheduler.register(Arc::new(jobs::BedChargeJob::new(
            engine.clone(),
            Duration::from_secs(config.scheduler.bed_charge_interval_secs),
        )));
        if let Some(notifier) = notifier.clone() {
            scheduler.register(Arc::new(jobs::DebtReminderJob::new(
                engine.clone(),
                db.clone(),
                notifier,
                Duration::from_secs(config.scheduler.debt_reminder_interval_secs),
            )));
        }
        scheduler.spawn_all();
        info!("Scheduled jobs: {:?}", scheduler.job_names());
    }

    // 启动Web服务器
    let addr: SocketAddr = format!("{}:{}", config.server.host, port).parse()?;
    let state = AppState {
        engine,
        db,
        auth,
        monitor,
        audit,
        events,
        notifier,
    };

    let server = WebServer::new(addr, state);
    if let Err(e) = server.run().await {
        error!("服务器启动失败: {}", e);
        return Err(e.into());
    }

    Ok(())
}
