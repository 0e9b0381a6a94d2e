//! Travel mode and vehicle enums shared across all crates.

/// Number of travel modes.  LOS tensors are dimensioned `[N_MODES]`.
pub const N_MODES: usize = 4;

// ── Mode ──────────────────────────────────────────────────────────────────────

/// The means by which an agent travels between zones.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    Car,
    Transit,
    Walk,
    Bike,
}

impl Mode {
    /// All modes, in LOS index order.
    pub const ALL: [Mode; N_MODES] = [Mode::Car, Mode::Transit, Mode::Walk, Mode::Bike];

    /// Index into per-mode arrays (LOS tensors, parameter tables).
    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            Mode::Car     => 0,
            Mode::Transit => 1,
            Mode::Walk    => 2,
            Mode::Bike    => 3,
        }
    }

    /// `true` for modes whose LOS differs between peak and off-peak periods.
    ///
    /// Walking and cycling times do not depend on congestion, so their LOS
    /// carries a single (off-peak) block.
    #[inline]
    pub fn uses_peak(self) -> bool {
        matches!(self, Mode::Car | Mode::Transit)
    }

    /// The vehicle an agent picks up when leaving home by this mode.
    #[inline]
    pub fn vehicle(self) -> Vehicle {
        match self {
            Mode::Car  => Vehicle::Car,
            Mode::Bike => Vehicle::Bike,
            Mode::Transit | Mode::Walk => Vehicle::None,
        }
    }

    /// Human-readable label, used in CSV columns and parameter names.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Car     => "Car",
            Mode::Transit => "Transit",
            Mode::Walk    => "Walk",
            Mode::Bike    => "Bike",
        }
    }

    /// Parse a CSV enum value.  Case-sensitive by design: input files are
    /// machine-written.
    pub fn from_str(s: &str) -> Option<Mode> {
        match s {
            "Car"     => Some(Mode::Car),
            "Transit" => Some(Mode::Transit),
            "Walk"    => Some(Mode::Walk),
            "Bike"    => Some(Mode::Bike),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Vehicle ───────────────────────────────────────────────────────────────────

/// The vehicle an agent currently has with them.
///
/// Derived from the mode used when leaving home; cleared on arrival back at
/// the residence.  A parked car constrains mode choice away from home.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Vehicle {
    #[default]
    None,
    Car,
    Bike,
}

impl Vehicle {
    pub fn as_str(self) -> &'static str {
        match self {
            Vehicle::None => "None",
            Vehicle::Car  => "Car",
            Vehicle::Bike => "Bike",
        }
    }
}

// ── ModeRules ─────────────────────────────────────────────────────────────────

/// Which modes are available to whom.
///
/// Non-car-owning agents choose from `no_car_modes`.  The default keeps all
/// modes available and lets the utility function discourage car use; configure
/// a restricted set to hard-exclude car instead.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeRules {
    /// Modes available to agents without a car.
    pub no_car_modes: Vec<Mode>,
}

impl Default for ModeRules {
    fn default() -> Self {
        Self { no_car_modes: Mode::ALL.to_vec() }
    }
}

impl ModeRules {
    /// The mode set available to an agent with the given car ownership.
    pub fn available(&self, owns_car: bool) -> &[Mode] {
        if owns_car { &Mode::ALL } else { &self.no_car_modes }
    }
}
