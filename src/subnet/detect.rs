//! Auto-detection of the local network from the default route.
//!
//! Detection is read-only: it shells out to `ip` and never changes network
//! configuration. Any missing piece yields `None`.
use super::SubnetSpec;
use std::net::Ipv4Addr;
use std::process::{Command, Stdio};

pub trait NetworkInspector {
    /// Interface carrying the IPv4 default route.
    fn default_route_interface(&self) -> Option<String>;

    /// First IPv4 address and prefix length assigned to `interface`.
    fn interface_ipv4(&self, interface: &str) -> Option<(Ipv4Addr, u8)>;
}

/// Inspector backed by iproute2.
#[derive(Debug, Clone)]
pub struct IpCommandInspector {
    program: String,
}

impl Default for IpCommandInspector {
    fn default() -> Self {
        Self {
            program: "ip".to_string(),
        }
    }
}

impl IpCommandInspector {
    fn query(&self, args: &[&str]) -> Option<String> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            tracing::debug!(
                program = %self.program,
                ?args,
                status = %output.status,
                "network query failed"
            );
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl NetworkInspector for IpCommandInspector {
    fn default_route_interface(&self) -> Option<String> {
        let text = self.query(&["-4", "route", "show", "default"])?;
        parse_default_route_interface(&text)
    }

    fn interface_ipv4(&self, interface: &str) -> Option<(Ipv4Addr, u8)> {
        let text = self.query(&["-o", "-4", "addr", "show", "dev", interface])?;
        parse_first_ipv4(&text)
    }
}

/// Extract the `dev` of the first default route line.
pub fn parse_default_route_interface(text: &str) -> Option<String> {
    text.lines()
        .filter(|line| line.trim_start().starts_with("default"))
        .find_map(|line| {
            let mut tokens = line.split_whitespace();
            tokens.find(|token| *token == "dev")?;
            tokens.next().map(|dev| dev.to_string())
        })
}

/// Extract the first `inet A.B.C.D/N` pair from `ip -o -4 addr` output.
pub fn parse_first_ipv4(text: &str) -> Option<(Ipv4Addr, u8)> {
    text.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        tokens.find(|token| *token == "inet")?;
        let (address, prefix) = tokens.next()?.split_once('/')?;
        let address: Ipv4Addr = address.parse().ok()?;
        let prefix: u8 = prefix.parse().ok().filter(|value| *value <= 32)?;
        Some((address, prefix))
    })
}

/// Network containing the default-route interface's first IPv4 address.
pub fn detect_subnet(inspector: &dyn NetworkInspector) -> Option<SubnetSpec> {
    let Some(interface) = inspector.default_route_interface() else {
        tracing::debug!("no IPv4 default route");
        return None;
    };
    let Some((address, prefix)) = inspector.interface_ipv4(&interface) else {
        tracing::debug!(%interface, "default route interface has no IPv4 address");
        return None;
    };
    let spec = SubnetSpec::containing(address, prefix)?;
    tracing::info!(%interface, %address, subnet = %spec, "detected local subnet");
    Some(spec)
}
