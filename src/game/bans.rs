/// Exact address mask.
pub const MASK_EXACT: u32 = 0xFFFF_FFFF;
/// Everything sharing the first three address octets.
pub const MASK_RANGE: u32 = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ban {
    ip: u32,
    mask: u32,
}

/// Banned client addresses, owned by the world.
#[derive(Debug, Clone, Default)]
pub struct BanList {
    bans: Vec<Ban>,
}

impl BanList {
    pub fn ban(&mut self, ip: u32, mask: u32) {
        let ban = Ban { ip, mask };
        if !self.bans.contains(&ban) {
            self.bans.push(ban);
            tracing::info!(ip = %format_ip(ip), mask = format_args!("{mask:#010x}"), "address banned");
        }
    }

    /// Whether `ip` falls under any ban. Address 0 (unknown) is never banned.
    pub fn is_banned(&self, ip: u32) -> bool {
        ip != 0
            && self
                .bans
                .iter()
                .any(|ban| ip & ban.mask == ban.ip & ban.mask)
    }

    pub fn len(&self) -> usize {
        self.bans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bans.is_empty()
    }
}

/// Addresses are stored in network order read as little-endian, so the
/// first octet is the low byte.
fn format_ip(ip: u32) -> String {
    let [a, b, c, d] = ip.to_le_bytes();
    format!("{a}.{b}.{c}.{d}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(a: u8, b: u8, c: u8, d: u8) -> u32 {
        u32::from_le_bytes([a, b, c, d])
    }

    #[test]
    fn exact_ban_spares_neighbours() {
        let mut bans = BanList::default();
        bans.ban(ip(10, 0, 0, 7), MASK_EXACT);
        assert!(bans.is_banned(ip(10, 0, 0, 7)));
        assert!(!bans.is_banned(ip(10, 0, 0, 8)));
    }

    #[test]
    fn range_ban_covers_the_last_octet() {
        let mut bans = BanList::default();
        bans.ban(ip(10, 0, 0, 7), MASK_RANGE);
        assert!(bans.is_banned(ip(10, 0, 0, 200)));
        assert!(!bans.is_banned(ip(10, 0, 1, 7)));
        assert!(!bans.is_banned(0));
        assert_eq!(format_ip(ip(10, 0, 0, 7)), "10.0.0.7");
    }
}
