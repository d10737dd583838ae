//! Named memory windows exported to external tools (cheats, RAM watch, scripts).
//!
//! A domain never owns bytes. It describes a masked window, and the free
//! functions [`peek`] and [`poke`] apply it to the buffer the caller passes in.

/// Byte order hint for multi-byte watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
    Unknown,
}

/// Which buffer of the machine a domain views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainTarget {
    MainRam,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDomain {
    pub name: &'static str,
    pub size: usize,
    pub endian: Endian,
    pub mask: u32,
    pub target: DomainTarget,
}

impl MemoryDomain {
    /// A domain over a whole power-of-two buffer.
    pub fn new(name: &'static str, size: usize, endian: Endian, target: DomainTarget) -> Self {
        debug_assert!(size.is_power_of_two());
        Self {
            name,
            size,
            endian,
            mask: (size as u32).wrapping_sub(1),
            target,
        }
    }
}

/// Reads through the domain mask.
pub fn peek(domain: &MemoryDomain, data: &[u8], addr: u32) -> u8 {
    data[(addr & domain.mask) as usize]
}

/// Writes through the domain mask.
pub fn poke(domain: &MemoryDomain, data: &mut [u8], addr: u32, value: u8) {
    data[(addr & domain.mask) as usize] = value;
}

/// Ordered domain list; the first entry is the main one.
#[derive(Debug, Clone, Default)]
pub struct MemoryDomainList {
    domains: Vec<MemoryDomain>,
}

impl MemoryDomainList {
    pub fn new(domains: Vec<MemoryDomain>) -> Self {
        Self { domains }
    }

    pub fn get(&self, name: &str) -> Option<&MemoryDomain> {
        self.domains.iter().find(|d| d.name == name)
    }

    pub fn main_domain(&self) -> Option<&MemoryDomain> {
        self.domains.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryDomain> {
        self.domains.iter()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
