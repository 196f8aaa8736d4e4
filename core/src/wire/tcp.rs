//! A TCP subset: SYN/ACK/FIN/RST/PSH flags only, no options, no window
//! scaling. `data_offset` is always 5 (20-byte header, no options) on
//! segments this engine emits, but is read faithfully on parse.

/// TCP control bit flags.
pub mod flags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
}

#[derive(Debug, Clone, Copy)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_num: u32,
    pub ack_num: u32,
    pub flags: u8,
    pub window: u16,
    pub checksum: u16,
}

impl TcpHeader {
    pub const SIZE: usize = 20;
    const DATA_OFFSET_WORDS: u8 = 5;

    pub fn new(src_port: u16, dst_port: u16, seq_num: u32, ack_num: u32, flags: u8, window: u16) -> Self {
        Self { src_port, dst_port, seq_num, ack_num, flags, window, checksum: 0 }
    }

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            src_port: u16::from_be_bytes([data[0], data[1]]),
            dst_port: u16::from_be_bytes([data[2], data[3]]),
            seq_num: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            ack_num: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            flags: data[13],
            window: u16::from_be_bytes([data[14], data[15]]),
            checksum: u16::from_be_bytes([data[16], data[17]]),
        })
    }

    pub fn write(&self, out: &mut [u8]) -> Option<()> {
        if out.len() < Self::SIZE {
            return None;
        }
        out[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        out[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        out[4..8].copy_from_slice(&self.seq_num.to_be_bytes());
        out[8..12].copy_from_slice(&self.ack_num.to_be_bytes());
        out[12] = Self::DATA_OFFSET_WORDS << 4;
        out[13] = self.flags;
        out[14..16].copy_from_slice(&self.window.to_be_bytes());
        out[16..18].copy_from_slice(&self.checksum.to_be_bytes());
        out[18..20].copy_from_slice(&0u16.to_be_bytes()); // urgent pointer, unused
        Some(())
    }

    pub fn data_offset_bytes(&self) -> usize {
        (Self::DATA_OFFSET_WORDS as usize) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let hdr = TcpHeader::new(1000, 80, 1, 0, flags::SYN, 1280);
        let mut buf = [0u8; TcpHeader::SIZE];
        hdr.write(&mut buf).unwrap();
        let parsed = TcpHeader::parse(&buf).unwrap();
        assert_eq!(parsed.src_port, 1000);
        assert_eq!(parsed.flags, flags::SYN);
        assert_eq!(parsed.seq_num, 1);
        assert_eq!(buf[12] >> 4, 5);
    }
}
