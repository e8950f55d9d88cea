//! Commands of the network plugin.

use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;

use routesh_terminal::{
    Command, ExecContext, ParamSpec, STATUS_FAILED, STATUS_OK, Signal, Status, ViewId,
};

use crate::interfaces::{Interface, InterfaceTable, mask_to_prefix};

/// Feature family of the interface configuration view.
pub const INTERFACE_FAMILY: &str = "if";

/// Interface table shared by the plugin and its commands.
pub type Shared = Rc<RefCell<InterfaceTable>>;

const DEFAULT_PING_COUNT: i64 = 5;
const MAX_PING_COUNT: i64 = 100;

/// Every command the plugin contributes, sharing one table.
pub fn all(table: &Shared) -> Vec<Box<dyn Command>> {
    vec![
        Box::new(InterfaceCmd::new(table)),
        Box::new(IpCmd::new(table)),
        Box::new(DescriptionCmd::new(table)),
        Box::new(ShutdownCmd::new(table)),
        Box::new(NoCmd::new(table)),
        Box::new(InterfacesCmd::new(table)),
        Box::new(PingCmd::new(table)),
    ]
}

fn interface_view() -> ViewId {
    ViewId::feature(INTERFACE_FAMILY)
}

/// Run `f` on the selected interface, or fail if none is selected.
fn with_selected<F>(table: &Shared, ctx: &mut ExecContext<'_>, f: F) -> Status
where
    F: FnOnce(&mut Interface, &mut ExecContext<'_>) -> Status,
{
    let mut table = table.borrow_mut();
    match table.selected_mut() {
        Some(iface) => f(iface, ctx),
        None => {
            ctx.println("% No interface selected");
            STATUS_FAILED
        },
    }
}

// ---------------------------------------------------------------------------
// interface
// ---------------------------------------------------------------------------

struct InterfaceCmd {
    table: Shared,
    params: Vec<ParamSpec>,
}
impl InterfaceCmd {
    fn new(table: &Shared) -> Self {
        Self {
            table: Rc::clone(table),
            params: vec![ParamSpec::string("name").help("Interface name, e.g. eth0")],
        }
    }
}
impl Command for InterfaceCmd {
    fn name(&self) -> &str {
        "interface"
    }
    fn description(&self) -> &str {
        "Configure network interfaces"
    }
    fn view(&self) -> ViewId {
        ViewId::Config
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn target_view(&self) -> Option<ViewId> {
        Some(interface_view())
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        let name = ctx.args[0].clone();
        if self.table.borrow_mut().select(&name) {
            log::debug!("Created interface {name}");
        }
        ctx.println(format!("Configuring interface: {name}"));
        ctx.signal(Signal::FeatureLabel(format!("{INTERFACE_FAMILY}-{name}")));
        STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// ip address
// ---------------------------------------------------------------------------

struct IpCmd {
    table: Shared,
    params: Vec<ParamSpec>,
}
impl IpCmd {
    fn new(table: &Shared) -> Self {
        Self {
            table: Rc::clone(table),
            params: vec![
                ParamSpec::choice("setting", &["address"]),
                ParamSpec::ip_address("address"),
                ParamSpec::ip_address("mask"),
            ],
        }
    }
}
impl Command for IpCmd {
    fn name(&self) -> &str {
        "ip"
    }
    fn description(&self) -> &str {
        "Configure IP parameters"
    }
    fn view(&self) -> ViewId {
        interface_view()
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        let parsed = (ctx.args[1].parse::<Ipv4Addr>(), ctx.args[2].parse::<Ipv4Addr>());
        let (Ok(addr), Ok(mask)) = parsed else {
            ctx.println("% Invalid address");
            return STATUS_FAILED;
        };
        let Some(prefix) = mask_to_prefix(mask) else {
            ctx.println(format!("% Bad mask {mask}"));
            return STATUS_FAILED;
        };
        with_selected(&self.table, ctx, |iface, ctx| {
            iface.address = Some((addr, prefix));
            ctx.println(format!("Setting IP address: {addr}/{mask}"));
            STATUS_OK
        })
    }
}

// ---------------------------------------------------------------------------
// description
// ---------------------------------------------------------------------------

struct DescriptionCmd {
    table: Shared,
    params: Vec<ParamSpec>,
}
impl DescriptionCmd {
    fn new(table: &Shared) -> Self {
        Self {
            table: Rc::clone(table),
            params: vec![ParamSpec::string("text").help("Quote text containing spaces")],
        }
    }
}
impl Command for DescriptionCmd {
    fn name(&self) -> &str {
        "description"
    }
    fn description(&self) -> &str {
        "Interface specific description"
    }
    fn view(&self) -> ViewId {
        interface_view()
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        let text = ctx.args[0].clone();
        with_selected(&self.table, ctx, |iface, _| {
            iface.description = Some(text);
            STATUS_OK
        })
    }
}

// ---------------------------------------------------------------------------
// shutdown / no
// ---------------------------------------------------------------------------

struct ShutdownCmd {
    table: Shared,
}
impl ShutdownCmd {
    fn new(table: &Shared) -> Self {
        Self {
            table: Rc::clone(table),
        }
    }
}
impl Command for ShutdownCmd {
    fn name(&self) -> &str {
        "shutdown"
    }
    fn description(&self) -> &str {
        "Shutdown the selected interface"
    }
    fn view(&self) -> ViewId {
        interface_view()
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        with_selected(&self.table, ctx, |iface, ctx| {
            iface.admin_up = false;
            ctx.println(format!(
                "%LINK-5-CHANGED: Interface {}, changed state to administratively down",
                iface.name
            ));
            STATUS_OK
        })
    }
}

struct NoCmd {
    table: Shared,
    params: Vec<ParamSpec>,
}
impl NoCmd {
    fn new(table: &Shared) -> Self {
        Self {
            table: Rc::clone(table),
            params: vec![ParamSpec::choice("setting", &["shutdown", "description", "ip"])],
        }
    }
}
impl Command for NoCmd {
    fn name(&self) -> &str {
        "no"
    }
    fn description(&self) -> &str {
        "Negate a command or set its defaults"
    }
    fn view(&self) -> ViewId {
        interface_view()
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        let setting = ctx.args[0].clone();
        with_selected(&self.table, ctx, |iface, ctx| {
            match setting.as_str() {
                "shutdown" => {
                    iface.admin_up = true;
                    ctx.println(format!(
                        "%LINK-3-UPDOWN: Interface {}, changed state to {}",
                        iface.name,
                        iface.status()
                    ));
                },
                "description" => iface.description = None,
                _ => iface.address = None,
            }
            STATUS_OK
        })
    }
}

// ---------------------------------------------------------------------------
// interfaces
// ---------------------------------------------------------------------------

struct InterfacesCmd {
    table: Shared,
}
impl InterfacesCmd {
    fn new(table: &Shared) -> Self {
        Self {
            table: Rc::clone(table),
        }
    }
}
impl Command for InterfacesCmd {
    fn name(&self) -> &str {
        "interfaces"
    }
    fn description(&self) -> &str {
        "Show interface status and addresses"
    }
    fn view(&self) -> ViewId {
        ViewId::Privileged
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        ctx.println(format!(
            "{:<14} {:<11} {:<18} {}",
            "Interface", "Status", "IP Address", "Description"
        ));
        ctx.println("-".repeat(60));
        let table = self.table.borrow();
        for iface in table.iter() {
            let address = iface
                .address
                .map_or_else(|| "--".to_string(), |(a, p)| format!("{a}/{p}"));
            let line = format!(
                "{:<14} {:<11} {:<18} {}",
                iface.name,
                iface.status(),
                address,
                iface.description.as_deref().unwrap_or("")
            );
            ctx.println(line.trim_end());
        }
        STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// ping
// ---------------------------------------------------------------------------

struct PingCmd {
    table: Shared,
    params: Vec<ParamSpec>,
}
impl PingCmd {
    fn new(table: &Shared) -> Self {
        Self {
            table: Rc::clone(table),
            params: vec![
                ParamSpec::ip_address("target"),
                ParamSpec::integer("count").optional().help("Repeat count, 1-100"),
            ],
        }
    }
}
impl Command for PingCmd {
    fn name(&self) -> &str {
        "ping"
    }
    fn description(&self) -> &str {
        "Send echo messages"
    }
    fn view(&self) -> ViewId {
        ViewId::Privileged
    }
    fn params(&self) -> &[ParamSpec] {
        &self.params
    }
    fn execute(&self, ctx: &mut ExecContext<'_>) -> Status {
        let count = match ctx.arg(1).map(str::parse::<i64>) {
            None => DEFAULT_PING_COUNT,
            Some(Ok(n)) if (1..=MAX_PING_COUNT).contains(&n) => n,
            Some(_) => {
                ctx.println(format!("% Repeat count must be 1-{MAX_PING_COUNT}"));
                return STATUS_FAILED;
            },
        };
        let Ok(target) = ctx.args[0].parse::<Ipv4Addr>() else {
            ctx.println("% Invalid address");
            return STATUS_FAILED;
        };
        let reachable = self.table.borrow().route_to(target).is_some();
        let n = count as usize;
        ctx.println(format!(
            "Sending {count}, 100-byte ICMP Echos to {target}, timeout is 2 seconds:"
        ));
        let (mark, ok) = if reachable { ('!', count) } else { ('.', 0) };
        ctx.println(std::iter::repeat_n(mark, n).collect::<String>());
        ctx.println(format!(
            "Success rate is {} percent ({ok}/{count})",
            ok * 100 / count
        ));
        STATUS_OK
    }
}
