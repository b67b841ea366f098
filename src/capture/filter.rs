//! BPF filter construction.

use crate::config::ListenSpec;

/// Build the BPF expression for a listen spec.
///
/// Five ANDed clauses (UDP, source MAC, source IP, destination IP,
/// destination MAC) plus the destination port. Each address list is OR'd
/// inside its clause.
pub fn build_filter(spec: &ListenSpec) -> String {
    format!(
        "udp and ether src ({}) and src host ({}) and dst host ({}) and ether dst ({}) and dst port {}",
        spec.src_macs.join(" or "),
        spec.src_ips.join(" or "),
        spec.dst_ips.join(" or "),
        spec.dst_macs.join(" or "),
        spec.dst_port
    )
}
