//! Cycle counts.

/// A count of CPU clock cycles.
///
/// Every bus access an instruction makes charges some number of these to the
/// host, which uses them to keep video and audio in step with the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl core::ops::AddAssign<u32> for Ticks {
    fn add_assign(&mut self, rhs: u32) {
        self.0 += u64::from(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::Ticks;

    #[test]
    fn bus_charges_accumulate() {
        let mut ticks = Ticks::ZERO;
        ticks += 4;
        ticks += 3;
        assert_eq!(ticks, Ticks::new(7));
        assert_eq!(ticks.get(), 7);
    }
}
