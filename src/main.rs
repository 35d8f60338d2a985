//! 权限内核命令行入口
//! 基于层级快照查询有效角色或检查单次授权

use kolibri_authz::{
    config::AppConfig,
    models::{Principal, Resource, Target},
    permissions::Operation,
    repository::{HierarchySnapshot, HierarchyStore, MemoryHierarchy},
    telemetry, PermissionGateway, RoleRelation,
};
use uuid::Uuid;

enum Command {
    Roles { source: Uuid, target: Uuid },
    Check { op: Operation, user: Uuid, target: Uuid },
}

fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    let command = match args.get(1).map(String::as_str) {
        Some("--version") => {
            println!("kolibri-authz {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some("--help") | None => {
            print_help();
            return Ok(());
        }
        Some("roles") if args.len() == 4 => Command::Roles {
            source: parse_id(&args[2])?,
            target: parse_id(&args[3])?,
        },
        Some("check") if args.len() == 5 => Command::Check {
            op: args[2].parse().map_err(|e: String| anyhow::anyhow!(e))?,
            user: parse_id(&args[3])?,
            target: parse_id(&args[4])?,
        },
        Some(other) => {
            eprintln!("未知参数: {}", other);
            print_help();
            std::process::exit(1);
        }
    };

    // 加载 .env 文件（开发环境）
    dotenv::dotenv().ok();

    // 1. 加载配置
    let config = match std::env::var("KOLIBRI_CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(path),
        Err(_) => AppConfig::from_env(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // 2. 初始化日志与指标
    telemetry::init_telemetry(&config);
    telemetry::init_metrics();

    // 3. 加载层级快照
    let snapshot_path = config
        .engine
        .snapshot_path
        .clone()
        .ok_or_else(|| anyhow::anyhow!("engine.snapshot_path is not configured"))?;
    let store = MemoryHierarchy::from_snapshot(
        HierarchySnapshot::load(&snapshot_path)?,
        config.engine.max_hierarchy_depth,
    )?;

    let gateway = PermissionGateway::from_config(&config)?;

    match command {
        Command::Roles { source, target } => {
            let source = find_user(&store, source)?;
            let target = find_target(&store, target)?;
            let roles = RoleRelation::new(&store).roles_for(&source, &target)?;
            println!("{}", roles);
        }
        Command::Check { op, user, target } => {
            let user = find_user(&store, user)?;
            let target = find_target(&store, target)?;
            let obj: &dyn Resource = match &target {
                Target::User(user) => user,
                Target::Collection(collection) => collection,
            };
            let allowed = gateway.authorize(&store, op, &user, obj)?;
            println!("{}", if allowed { "allow" } else { "deny" });
            if !allowed {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

fn parse_id(value: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| anyhow::anyhow!("Invalid id {}: {}", value, e))
}

fn find_user(store: &MemoryHierarchy, id: Uuid) -> anyhow::Result<Principal> {
    store
        .user(id)?
        .ok_or_else(|| anyhow::anyhow!("User not found: {}", id))
}

/// 目标可以是用户或集合
fn find_target(store: &MemoryHierarchy, id: Uuid) -> anyhow::Result<Target> {
    if let Some(user) = store.user(id)? {
        return Ok(Target::User(user));
    }
    store
        .collection(id)?
        .map(Target::Collection)
        .ok_or_else(|| anyhow::anyhow!("No user or collection with id {}", id))
}

/// 打印帮助信息
fn print_help() {
    println!("kolibri-authz {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: kolibri-authz <命令> [参数]");
    println!();
    println!("命令:");
    println!("  roles <源用户ID> <目标ID>                       打印源用户相对目标的有效角色");
    println!("  check <create|read|update|delete> <用户ID> <目标ID>  检查一次授权");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  KOLIBRI_CONFIG_FILE                 可选的配置文件");
    println!("  KOLIBRI_ENGINE__SNAPSHOT_PATH       层级快照 JSON 文件");
}
