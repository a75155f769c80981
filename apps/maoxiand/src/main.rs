use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use maoxian::world::{SharedWorld, World};
use tokio::net::TcpListener;
use tracing::{Level, info, warn};

mod ssh;
mod telnet;

/// Longest player name, in characters.
const NAME_MAX: usize = 20;
const DEFAULT_SSH_PORT: &str = "9999";

fn usage_and_exit() -> ! {
    eprintln!(
        "maoxiand (Maoxian world server)\n\n\
USAGE:\n  maoxiand\n\n\
FILES:\n  {}  SSH host key (required)\n\n\
ENV:\n  SSH_PORT             default {}\n  MAOXIAN_HOST         default 0.0.0.0\n  MAOXIAN_TELNET_PORT  optional; also serve plain telnet on this port\n  MAOXIAN_WORLD        optional; YAML world file (default: built-in world)\n  RUST_LOG             optional; default info\n",
        ssh::HOST_KEY_PATH,
        DEFAULT_SSH_PORT
    );
    std::process::exit(2);
}

#[derive(Clone, Debug)]
struct Config {
    ssh_bind: SocketAddr,
    telnet_bind: Option<SocketAddr>,
    world_path: Option<PathBuf>,
}

fn bind_addr(host: &str, port: &str) -> Option<SocketAddr> {
    let ip: IpAddr = host.trim().parse().ok()?;
    let port: u16 = port.trim().parse().ok()?;
    Some(SocketAddr::new(ip, port))
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env() -> Config {
    if std::env::args().len() > 1 {
        usage_and_exit();
    }
    let host = env_nonempty("MAOXIAN_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port = env_nonempty("SSH_PORT").unwrap_or_else(|| DEFAULT_SSH_PORT.to_string());
    let ssh_bind = bind_addr(&host, &port).unwrap_or_else(|| usage_and_exit());
    let telnet_bind = env_nonempty("MAOXIAN_TELNET_PORT")
        .map(|port| bind_addr(&host, &port).unwrap_or_else(|| usage_and_exit()));
    let world_path = env_nonempty("MAOXIAN_WORLD").map(PathBuf::from);

    Config {
        ssh_bind,
        telnet_bind,
        world_path,
    }
}

fn load_world(path: Option<&Path>) -> anyhow::Result<World> {
    let world = match path {
        Some(path) => {
            let src = std::fs::read_to_string(path)
                .with_context(|| format!("read world file {}", path.display()))?;
            World::from_yaml(&src).with_context(|| format!("load world {}", path.display()))?
        }
        None => World::embedded().context("load built-in world")?,
    };
    for room in world.unreachable_rooms() {
        warn!(room = %room, "room cannot be reached from the start room");
    }
    Ok(world)
}

/// Keep ASCII letters, digits, `_` and `-`; at most [`NAME_MAX`] of them.
fn sanitize_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .take(NAME_MAX)
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,maoxian=info".into()),
        )
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let cfg = parse_env();
    let host_key = ssh::load_host_key(Path::new(ssh::HOST_KEY_PATH))?;
    let world = load_world(cfg.world_path.as_deref())?;
    info!(
        rooms = world.rooms().count(),
        start_room = %world.start_room(),
        "world loaded"
    );
    let world: SharedWorld = Arc::new(tokio::sync::Mutex::new(world));

    let ssh_listener = TcpListener::bind(cfg.ssh_bind)
        .await
        .with_context(|| format!("bind ssh {}", cfg.ssh_bind))?;
    info!(bind = %cfg.ssh_bind, "maoxian listening for ssh");

    if let Some(bind) = cfg.telnet_bind {
        let listener = TcpListener::bind(bind)
            .await
            .with_context(|| format!("bind telnet {bind}"))?;
        info!(bind = %bind, "maoxian listening for telnet");
        tokio::spawn(telnet::serve(listener, world.clone()));
    }

    ssh::serve(ssh_listener, ssh::server_config(host_key), world).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_filtered_and_capped() {
        assert_eq!(sanitize_name("  alice \r"), "alice");
        assert_eq!(sanitize_name("bob the builder!"), "bobthebuilder");
        assert_eq!(sanitize_name("x_y-z"), "x_y-z");
        assert_eq!(sanitize_name("!!!"), "");
        assert_eq!(sanitize_name(&"a".repeat(50)).len(), NAME_MAX);
        // The cap counts kept characters, not skipped ones.
        assert_eq!(sanitize_name(&format!("{}{}", "!".repeat(30), "bob")), "bob");
    }

    #[test]
    fn bind_address_from_host_and_port() {
        assert_eq!(
            bind_addr("0.0.0.0", DEFAULT_SSH_PORT),
            Some("0.0.0.0:9999".parse().unwrap())
        );
        assert_eq!(bind_addr("::1", "4000"), Some("[::1]:4000".parse().unwrap()));
        assert_eq!(bind_addr("localhost", "9999"), None);
        assert_eq!(bind_addr("127.0.0.1", "99999"), None);
    }

    #[test]
    fn broken_world_file_is_a_boot_error() {
        let missing = std::env::temp_dir().join("maoxiand-no-such-world.yaml");
        let err = load_world(Some(&missing)).unwrap_err();
        assert!(format!("{err:#}").contains("read world file"));
        assert!(load_world(None).is_ok());
    }
}
