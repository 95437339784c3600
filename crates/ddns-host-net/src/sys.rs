// Interface enumeration through nix's safe getifaddrs/if_nametoindex bindings.

use nix::ifaddrs::getifaddrs;
use nix::net::if_::{if_indextoname, if_nametoindex};
use std::io;
use std::net::SocketAddrV6;

/// One IPv6 address bound to a named interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub address: SocketAddrV6,
}

/// Index of the named interface, or `None` if no such interface exists
pub fn interface_index(name: &str) -> Option<u32> {
    if_nametoindex(name).ok().filter(|index| *index != 0)
}

/// Name of the interface with the given index
pub fn interface_name(index: u32) -> Option<String> {
    let name = if_indextoname(index).ok()?;
    Some(name.to_string_lossy().into_owned())
}

/// Every IPv6 address on the host, in getifaddrs order
pub fn ipv6_addresses() -> io::Result<Vec<InterfaceAddress>> {
    let addresses = getifaddrs().map_err(io::Error::from)?;

    Ok(addresses
        .filter_map(|entry| {
            let sin6 = *entry.address.as_ref()?.as_sockaddr_in6()?;
            Some(InterfaceAddress {
                name: entry.interface_name,
                address: SocketAddrV6::from(sin6),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_interface_has_no_index() {
        assert_eq!(interface_index("nosuchif0"), None);
        assert_eq!(interface_index("bad\0name"), None);
    }

    #[test]
    fn test_index_name_round_trip() {
        let loopback = if cfg!(target_os = "linux") { "lo" } else { "lo0" };
        let index = interface_index(loopback).expect("loopback interface exists");
        assert_eq!(interface_name(index).as_deref(), Some(loopback));
    }

    #[test]
    fn test_enumeration_succeeds() {
        assert!(ipv6_addresses().is_ok());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_enumerated_addresses_keep_scope() {
        // Link-local addresses always carry their interface's scope id
        for entry in ipv6_addresses().unwrap() {
            if entry.address.ip().is_unicast_link_local() {
                assert_eq!(Some(entry.address.scope_id()), interface_index(&entry.name));
            }
        }
    }
}
