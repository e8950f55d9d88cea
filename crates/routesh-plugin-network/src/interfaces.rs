//! Simulated interface table.

use std::net::Ipv4Addr;

/// Administrative and link state of one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub description: Option<String>,
    pub address: Option<(Ipv4Addr, u8)>,
    pub admin_up: bool,
    pub link_up: bool,
}

impl Interface {
    fn new(name: &str, link_up: bool) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            address: None,
            admin_up: true,
            link_up,
        }
    }

    pub fn status(&self) -> &'static str {
        match (self.admin_up, self.link_up) {
            (false, _) => "admin down",
            (true, false) => "down",
            (true, true) => "up",
        }
    }

    pub fn is_up(&self) -> bool {
        self.admin_up && self.link_up
    }

    /// Whether `target` is on this interface's connected subnet.
    pub fn reaches(&self, target: Ipv4Addr) -> bool {
        match self.address {
            Some((addr, prefix)) if self.is_up() => {
                let mask = prefix_mask(prefix);
                u32::from(addr) & mask == u32::from(target) & mask
            },
            _ => false,
        }
    }
}

/// The interfaces known to the plugin plus the one being configured.
#[derive(Debug, Clone)]
pub struct InterfaceTable {
    interfaces: Vec<Interface>,
    selected: Option<usize>,
}

impl Default for InterfaceTable {
    fn default() -> Self {
        let mut eth0 = Interface::new("eth0", true);
        eth0.address = Some((Ipv4Addr::new(192, 168, 1, 1), 24));
        Self {
            interfaces: vec![eth0, Interface::new("eth1", false)],
            selected: None,
        }
    }
}

impl InterfaceTable {
    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Select `name` for configuration, creating it if needed. Returns
    /// whether it was created.
    pub fn select(&mut self, name: &str) -> bool {
        if let Some(idx) = self.interfaces.iter().position(|i| i.name == name) {
            self.selected = Some(idx);
            return false;
        }
        self.interfaces.push(Interface::new(name, true));
        self.selected = Some(self.interfaces.len() - 1);
        true
    }

    pub fn selected(&self) -> Option<&Interface> {
        self.selected.map(|idx| &self.interfaces[idx])
    }

    pub fn selected_mut(&mut self) -> Option<&mut Interface> {
        self.selected.map(|idx| &mut self.interfaces[idx])
    }

    /// First up interface whose subnet contains `target`.
    pub fn route_to(&self, target: Ipv4Addr) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.reaches(target))
    }
}

/// Prefix length of a contiguous netmask, `None` for masks like
/// `255.0.255.0`.
pub fn mask_to_prefix(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    let ones = bits.leading_ones();
    (ones + bits.trailing_zeros() == 32).then_some(ones as u8)
}

fn prefix_mask(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        p => u32::MAX << (32 - u32::from(p.min(32))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_interfaces() {
        let table = InterfaceTable::default();
        let names: Vec<&str> = table.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["eth0", "eth1"]);
        assert_eq!(table.get("eth0").unwrap().status(), "up");
        assert_eq!(table.get("eth1").unwrap().status(), "down");
        assert!(table.selected().is_none());
    }

    #[test]
    fn select_existing_and_new() {
        let mut table = InterfaceTable::default();
        assert!(!table.select("eth1"));
        assert_eq!(table.selected().unwrap().name, "eth1");
        assert!(table.select("lo0"));
        assert_eq!(table.selected().unwrap().name, "lo0");
        assert_eq!(table.iter().count(), 3);
    }

    #[test]
    fn contiguous_masks() {
        assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 255, 255, 0)), Some(24));
        assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 255, 255, 255)), Some(32));
        assert_eq!(mask_to_prefix(Ipv4Addr::new(0, 0, 0, 0)), Some(0));
        assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 0, 255, 0)), None);
    }

    #[test]
    fn routing_needs_up_interface_on_subnet() {
        let mut table = InterfaceTable::default();
        assert_eq!(
            table.route_to(Ipv4Addr::new(192, 168, 1, 20)).map(|i| i.name.as_str()),
            Some("eth0")
        );
        assert!(table.route_to(Ipv4Addr::new(10, 0, 0, 1)).is_none());

        table.select("eth0");
        table.selected_mut().unwrap().admin_up = false;
        assert!(table.route_to(Ipv4Addr::new(192, 168, 1, 20)).is_none());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prefix_round_trips_through_mask(prefix in 0u8..=32) {
                let mask = Ipv4Addr::from(prefix_mask(prefix));
                prop_assert_eq!(mask_to_prefix(mask), Some(prefix));
            }
        }
    }
}
