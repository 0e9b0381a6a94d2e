//! Columnar zone attributes.

/// Zonal land-use columns, indexed by `ZoneId` (file order).
///
/// The log columns are precomputed as `ln(1 + x)` so destination-attraction
/// terms never hit `ln(0)` for empty zones.
#[derive(Clone, Debug, Default)]
pub struct ZoneTable {
    pub n: usize,
    pub population: Vec<f64>,
    pub employment: Vec<f64>,
    /// Parking rate in currency per hour, as loaded.
    pub parking_per_hour: Vec<f64>,

    // ── Precomputed ───────────────────────────────────────────────────────
    pub log_pop: Vec<f64>,
    pub log_emp: Vec<f64>,
    /// Parking rate per minute — the unit utility specifications consume.
    pub parking_per_min: Vec<f64>,
}

impl ZoneTable {
    /// Build the table and its derived columns.
    ///
    /// # Panics
    ///
    /// Panics if the column lengths disagree.
    pub fn new(population: Vec<f64>, employment: Vec<f64>, parking_per_hour: Vec<f64>) -> Self {
        let n = population.len();
        assert_eq!(employment.len(), n, "employment column length");
        assert_eq!(parking_per_hour.len(), n, "parking column length");

        let log_pop = population.iter().map(|&p| (1.0 + p).ln()).collect();
        let log_emp = employment.iter().map(|&e| (1.0 + e).ln()).collect();
        let parking_per_min = parking_per_hour.iter().map(|&r| r / 60.0).collect();

        Self {
            n,
            population,
            employment,
            parking_per_hour,
            log_pop,
            log_emp,
            parking_per_min,
        }
    }
}
