//! End-to-end exercises of `Stack<HostedPlatform>` across routing, UDP,
//! TCP-Lite and RX dispatch.

use platform_hosted::HostedPlatform;
use rtnet_core::addr::{Ipv6Address, MacAddress};
use rtnet_core::buffer::QosClass;
use rtnet_core::config::MAX_ROUTING_ENTRIES;
use rtnet_core::error::NetError;
use rtnet_core::stack::{Stack, StackConfig};

fn addr(last: u8) -> Ipv6Address {
    Ipv6Address::new([0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, last])
}

fn local() -> (Ipv6Address, MacAddress) {
    (
        Ipv6Address::new([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x10]),
        MacAddress::new([0x00, 0xDE, 0xAD, 0xBE, 0xEF, 0x01]),
    )
}

#[test]
fn initialize_yields_zeroed_stats_and_link_local_route() {
    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();

    let stats = stack.get_statistics();
    assert_eq!(stats.rx_packets, 0);
    assert_eq!(stats.tx_packets, 0);
    assert_eq!(stats.rx_errors, 0);
    assert_eq!(stats.checksum_errors, 0);
}

#[test]
fn initialize_rejects_unspecified_identity() {
    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    assert_eq!(
        stack.initialize(Ipv6Address::UNSPECIFIED, MacAddress::new([1, 2, 3, 4, 5, 6])),
        Err(NetError::InvalidParam)
    );
}

#[test]
fn udp_send_succeeds_with_route_and_increments_tx_packets() {
    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();
    stack.add_route(addr(1), 128, None, 1).unwrap();

    stack
        .udp_send(addr(1), 12345, 0, b"hello from host", QosClass::Normal)
        .unwrap();

    let stats = stack.get_statistics();
    assert_eq!(stats.tx_packets, 1);
    assert_eq!(stats.tx_dropped, 0);
}

#[test]
fn udp_send_succeeds_with_payload_at_exactly_mtu() {
    use rtnet_core::config::MTU;

    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();
    stack.add_route(addr(1), 128, None, 1).unwrap();

    let payload = [0u8; MTU];
    stack
        .udp_send(addr(1), 12345, 0, &payload, QosClass::Normal)
        .unwrap();

    assert_eq!(stack.get_statistics().tx_packets, 1);
}

#[test]
fn udp_send_rejects_oversized_payload_without_touching_counters() {
    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();
    stack.add_route(addr(1), 128, None, 1).unwrap();

    let oversized = [0u8; 2000];
    let before = stack.get_statistics();
    assert_eq!(
        stack.udp_send(addr(1), 12345, 0, &oversized, QosClass::Normal),
        Err(NetError::InvalidParam)
    );
    let after = stack.get_statistics();
    assert_eq!(before.tx_packets, after.tx_packets);
    assert_eq!(before.tx_dropped, after.tx_dropped);
}

#[test]
fn udp_send_without_route_returns_no_route() {
    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();

    assert_eq!(
        stack.udp_send(addr(99), 80, 0, b"x", QosClass::Normal),
        Err(NetError::NoRoute)
    );
}

#[test]
fn routing_table_overflows_after_capacity() {
    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();

    // Slot 0 is already occupied by the link-local default route.
    for i in 1..MAX_ROUTING_ENTRIES {
        stack.add_route(addr(i as u8), 128, None, 1).unwrap();
    }
    assert_eq!(
        stack.add_route(addr(250), 128, None, 1),
        Err(NetError::Overflow)
    );
}

#[test]
fn tcp_connect_send_close_then_reject_further_sends() {
    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();
    stack.add_route(addr(1), 128, None, 1).unwrap();

    let handle = stack.tcp_connect(addr(1), 80).unwrap();
    stack
        .tcp_send(handle, b"GET / HTTP/1.1\r\nHost: demo\r\n\r\n")
        .unwrap();
    stack.tcp_close(handle).unwrap();

    assert_eq!(stack.tcp_send(handle, b"late"), Err(NetError::Connection));
}

#[test]
fn process_rx_rejects_short_frame() {
    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();

    let short = [0u8; 30];
    assert_eq!(stack.process_rx(&short), Err(NetError::InvalidParam));
    assert_eq!(stack.get_statistics().rx_errors, 1);
}

#[test]
fn process_rx_rejects_bad_icmpv6_checksum() {
    use rtnet_core::wire::ethernet::{EthernetHeader, ETHERTYPE_IPV6};
    use rtnet_core::wire::icmpv6::{EchoData, Icmpv6Message};
    use rtnet_core::wire::ipv6::{Ipv6Header, NEXT_HEADER_ICMPV6};

    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();

    let peer = addr(5);
    let peer_mac = MacAddress::new([2, 2, 2, 2, 2, 2]);
    let data = EchoData { len: 0, bytes: [0u8; rtnet_core::config::MTU - 48] };
    let msg = Icmpv6Message::EchoRequest { identifier: 1, sequence: 1, data };

    let mut icmp_buf = [0u8; 8];
    let icmp_len = msg.write(&mut icmp_buf).unwrap();
    // Checksum field is left zero, which here is simply wrong for this
    // pseudo-header: the point of the test is that it disagrees.

    let mut frame = [0u8; 14 + 40 + 8];
    EthernetHeader { dst: mac, src: peer_mac, ethertype: ETHERTYPE_IPV6 }
        .write(&mut frame[..14])
        .unwrap();
    Ipv6Header::new(NEXT_HEADER_ICMPV6, icmp_len as u16, peer, ipv6)
        .write(&mut frame[14..54])
        .unwrap();
    frame[54..54 + icmp_len].copy_from_slice(&icmp_buf[..icmp_len]);

    assert_eq!(stack.process_rx(&frame), Err(NetError::Checksum));
    assert_eq!(stack.get_statistics().checksum_errors, 1);
}

#[test]
fn process_rx_rejects_bad_tcp_checksum() {
    use rtnet_core::wire::ethernet::{EthernetHeader, ETHERTYPE_IPV6};
    use rtnet_core::wire::ipv6::{Ipv6Header, NEXT_HEADER_TCP};
    use rtnet_core::wire::tcp::TcpHeader;

    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();

    let peer = addr(5);
    let peer_mac = MacAddress::new([2, 2, 2, 2, 2, 2]);
    let seg = TcpHeader::new(44000, 80, 1, 0, rtnet_core::wire::tcp::flags::SYN, 1024);

    let mut tcp_buf = [0u8; TcpHeader::SIZE];
    seg.write(&mut tcp_buf).unwrap();
    // Checksum field is left zero, which disagrees with the real pseudo-header.

    let mut frame = [0u8; 14 + 40 + TcpHeader::SIZE];
    EthernetHeader { dst: mac, src: peer_mac, ethertype: ETHERTYPE_IPV6 }
        .write(&mut frame[..14])
        .unwrap();
    Ipv6Header::new(NEXT_HEADER_TCP, TcpHeader::SIZE as u16, peer, ipv6)
        .write(&mut frame[14..54])
        .unwrap();
    frame[54..].copy_from_slice(&tcp_buf);

    assert_eq!(stack.process_rx(&frame), Err(NetError::Checksum));
    assert_eq!(stack.get_statistics().checksum_errors, 1);
}

#[test]
fn neighbor_advertisement_then_udp_send_resolves_without_no_route() {
    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();
    stack.add_route(addr(1), 128, None, 1).unwrap();
    stack
        .on_neighbor_advertisement(addr(1), MacAddress::new([9, 9, 9, 9, 9, 9]))
        .unwrap();

    stack.udp_send(addr(1), 53, 0, b"query", QosClass::Normal).unwrap();
    assert_eq!(stack.get_statistics().tx_packets, 1);
}

#[test]
fn udp_send_falls_back_to_multicast_mac_on_neighbor_miss() {
    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();
    stack.add_route(addr(1), 128, None, 1).unwrap();

    // No on_neighbor_advertisement was ever delivered for addr(1); the send
    // still completes rather than blocking on resolution.
    stack.udp_send(addr(1), 53, 0, b"query", QosClass::Normal).unwrap();
    assert_eq!(stack.get_statistics().tx_packets, 1);
}

#[test]
fn periodic_task_ages_stale_route_without_touching_link_local() {
    let platform = HostedPlatform::new();
    let mut stack = Stack::new(platform, StackConfig::default());
    let (ipv6, mac) = local();
    stack.initialize(ipv6, mac).unwrap();
    stack.add_route(addr(1), 128, None, 1).unwrap();

    // Freshly-touched route survives a periodic pass well inside the aging
    // horizon; the hosted clock advances only a few milliseconds here.
    stack.periodic_task();
    stack.udp_send(addr(1), 80, 0, b"x", QosClass::Normal).unwrap();
    assert_eq!(stack.get_statistics().tx_dropped, 0);
}
