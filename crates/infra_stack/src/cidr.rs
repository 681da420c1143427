//! IPv4 CIDR parsing and subnet carving.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::{StackError, StackResult};

/// An IPv4 network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    base: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    pub fn new(base: Ipv4Addr, prefix: u8) -> StackResult<Self> {
        if prefix > 32 {
            return Err(StackError::InvalidCidr(format!("{}/{}", base, prefix)));
        }
        let cidr = Self { base, prefix };
        if u32::from(base) & !cidr.mask() != 0 {
            return Err(StackError::InvalidCidr(format!(
                "{}/{} has host bits set",
                base, prefix
            )));
        }
        Ok(cidr)
    }

    pub fn base(&self) -> Ipv4Addr {
        self.base
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix as u32)
    }

    pub fn contains(&self, other: &Cidr) -> bool {
        other.prefix >= self.prefix
            && (u32::from(other.base) & self.mask()) == u32::from(self.base)
    }

    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix as u32)
        }
    }
}

impl FromStr for Cidr {
    type Err = StackError;

    fn from_str(s: &str) -> StackResult<Self> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| StackError::InvalidCidr(s.to_string()))?;
        let base: Ipv4Addr = addr
            .trim()
            .parse()
            .map_err(|_| StackError::InvalidCidr(s.to_string()))?;
        let prefix: u8 = prefix
            .trim()
            .parse()
            .map_err(|_| StackError::InvalidCidr(s.to_string()))?;
        Cidr::new(base, prefix)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

/// Hands out consecutive, non-overlapping subnets from a parent block.
#[derive(Debug, Clone)]
pub struct SubnetAllocator {
    parent: Cidr,
    next: u64,
}

impl SubnetAllocator {
    pub fn new(parent: Cidr) -> Self {
        Self {
            next: u32::from(parent.base) as u64,
            parent,
        }
    }

    /// Allocate the next free subnet with the given prefix length.
    pub fn allocate(&mut self, prefix: u8) -> StackResult<Cidr> {
        if prefix < self.parent.prefix || prefix > 32 {
            return Err(StackError::InvalidCidr(format!(
                "/{} does not fit in {}",
                prefix, self.parent
            )));
        }
        let size = 1u64 << (32 - prefix as u32);
        // Align up to the subnet size.
        let start = self.next.div_ceil(size) * size;
        let end = u32::from(self.parent.base) as u64 + self.parent.size();
        if start + size > end {
            return Err(StackError::CidrExhausted {
                cidr: self.parent.to_string(),
                mask: prefix,
            });
        }
        self.next = start + size;
        Cidr::new(Ipv4Addr::from(start as u32), prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let cidr: Cidr = "10.0.0.0/16".parse().unwrap();
        assert_eq!(cidr.prefix(), 16);
        assert_eq!(cidr.to_string(), "10.0.0.0/16");
        assert_eq!(cidr.size(), 65536);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("10.0.0.0".parse::<Cidr>().is_err());
        assert!("10.0.0.0/33".parse::<Cidr>().is_err());
        assert!("10.0.0.1/16".parse::<Cidr>().is_err());
        assert!("nope/8".parse::<Cidr>().is_err());
    }

    #[test]
    fn test_allocator_carves_consecutive_subnets() {
        let mut alloc = SubnetAllocator::new("10.0.0.0/16".parse().unwrap());
        let subnets: Vec<String> = (0..4).map(|_| alloc.allocate(24).unwrap().to_string()).collect();
        assert_eq!(
            subnets,
            vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"]
        );
    }

    #[test]
    fn test_allocator_aligns_mixed_sizes() {
        let mut alloc = SubnetAllocator::new("10.0.0.0/16".parse().unwrap());
        assert_eq!(alloc.allocate(26).unwrap().to_string(), "10.0.0.0/26");
        assert_eq!(alloc.allocate(24).unwrap().to_string(), "10.0.1.0/24");
    }

    #[test]
    fn test_allocator_exhaustion() {
        let mut alloc = SubnetAllocator::new("10.0.0.0/23".parse().unwrap());
        alloc.allocate(24).unwrap();
        alloc.allocate(24).unwrap();
        assert!(matches!(alloc.allocate(24), Err(StackError::CidrExhausted { .. })));
    }

    #[test]
    fn test_contains_and_overlap() {
        let vpc: Cidr = "10.0.0.0/16".parse().unwrap();
        let subnet: Cidr = "10.0.3.0/24".parse().unwrap();
        let client: Cidr = "10.100.0.0/22".parse().unwrap();
        assert!(vpc.contains(&subnet));
        assert!(!vpc.overlaps(&client));
    }
}
