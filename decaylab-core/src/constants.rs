//! Physical constants and the reference decay channel.

/// PDG code of the deuteron.
pub const PDG_DEUTERON: i32 = 1_000_010_020;
/// PDG code of the negative kaon.
pub const PDG_KAON_MINUS: i32 = -321;
/// PDG code of the positive pion.
pub const PDG_PION_PLUS: i32 = 211;

/// Deuteron mass (GeV/c²).
pub const MASS_DEUTERON: f64 = 1.875_612_9;
/// Charged kaon mass (GeV/c²).
pub const MASS_KAON: f64 = 0.493_677;
/// Charged pion mass (GeV/c²).
pub const MASS_PION: f64 = 0.139_570;

/// Curvature constant: GeV/c per (kG · cm).
pub const KAPPA: f64 = 0.299_792_458e-3;

/// Field unit conversion applied to the configured magnetic field.
pub const TESLA_TO_KGAUSS: f64 = 10.0;

/// Below this curvature (1/cm) a helix is treated as a straight line.
pub const MIN_CURVATURE: f64 = 1e-12;
