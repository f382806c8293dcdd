//! Iterative three-prong vertex fitter.
//!
//! Minimises the (optionally covariance-weighted) squared distances between a
//! common vertex and each track's point of closest approach to it.

use nalgebra::{Matrix2, Matrix3, Matrix3x2, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::components::propagator::Helix;
use crate::domain::TrackParCov;

use super::VertexFitEngine;

/// Fitter configuration, fixed for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    /// Move the tracks to the fitted vertex before reporting their residuals.
    pub propagate_to_pca: bool,
    /// Largest accepted transverse radius of the fitted vertex (cm).
    #[serde(with = "crate::float_serde")]
    pub max_r: f64,
    /// Stop when the vertex moves less than this between iterations (cm).
    #[serde(with = "crate::float_serde")]
    pub min_param_change: f64,
    /// Stop when the chi-square ratio to the previous iteration exceeds this.
    #[serde(with = "crate::float_serde")]
    pub min_rel_chi2_change: f64,
    /// Largest accepted z spread of the tracks at the seed (cm).
    #[serde(with = "crate::float_serde")]
    pub max_dz_ini: f64,
    /// Largest accepted total chi-square.
    #[serde(with = "crate::float_serde")]
    pub max_chi2: f64,
    /// Use plain distances instead of covariance-weighted ones.
    pub use_abs_dca: bool,
    pub max_iterations: usize,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            propagate_to_pca: true,
            max_r: 1.0,
            min_param_change: 1e-3,
            min_rel_chi2_change: 0.9,
            max_dz_ini: 1e9,
            max_chi2: 1e9,
            use_abs_dca: true,
            max_iterations: 20,
        }
    }
}

/// Per-track linearisation around the current vertex estimate.
struct Projection {
    point: Point3<f64>,
    weight: Matrix3<f64>,
}

/// Three-prong fitter exposing the engine contract of [`VertexFitEngine`].
#[derive(Debug, Clone)]
pub struct DcaFitter {
    config: FitterConfig,
    bz_kg: f64,
    vertex: Point3<f64>,
    chi2: [f64; 3],
    n_candidates: usize,
}

impl DcaFitter {
    pub fn new(config: FitterConfig, bz_kg: f64) -> Self {
        Self {
            config,
            bz_kg,
            vertex: Point3::origin(),
            chi2: [0.0; 3],
            n_candidates: 0,
        }
    }

    pub fn config(&self) -> &FitterConfig {
        &self.config
    }

    pub fn bz_kg(&self) -> f64 {
        self.bz_kg
    }

    /// Number of vertices found by the last `process` call.
    pub fn n_candidates(&self) -> usize {
        self.n_candidates
    }

    /// Point closest to the three straight tangents at the tracks' reference points.
    fn seed(tracks: &[TrackParCov; 3]) -> Option<Point3<f64>> {
        let mut a = Matrix3::zeros();
        let mut b = Vector3::zeros();
        for t in tracks {
            let d = t.param.direction();
            let proj = Matrix3::identity() - d * d.transpose();
            a += proj;
            b += proj * t.param.position().coords;
        }
        a.lu().solve(&b).map(Point3::from)
    }

    fn project(&self, helix: &Helix, track: &TrackParCov, vertex: &Point3<f64>) -> Option<Projection> {
        let s = helix.closest_approach(vertex).ok()?;
        let point = helix.position_at(s);
        let t = helix.direction_at(s);

        // Orthonormal frame across the track: e1 in the bending plane, e2 completing it.
        let e1 = Vector3::new(-t.y, t.x, 0.0).try_normalize(f64::EPSILON)?;
        let e2 = t.cross(&e1);
        let g = if self.config.use_abs_dca {
            Matrix2::identity()
        } else {
            track.cov.position_block().try_inverse()?
        };
        let e = Matrix3x2::from_columns(&[e1, e2]);
        Some(Projection {
            point,
            weight: e * g * e.transpose(),
        })
    }

    fn project_all(
        &self,
        helices: &[Helix; 3],
        tracks: &[TrackParCov; 3],
        vertex: &Point3<f64>,
    ) -> Option<[Projection; 3]> {
        Some([
            self.project(&helices[0], &tracks[0], vertex)?,
            self.project(&helices[1], &tracks[1], vertex)?,
            self.project(&helices[2], &tracks[2], vertex)?,
        ])
    }

    fn chi2_of(projections: &[Projection; 3], vertex: &Point3<f64>) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (c, p) in out.iter_mut().zip(projections) {
            let r = vertex - p.point;
            *c = r.dot(&(p.weight * r));
        }
        out
    }

    fn solve(projections: &[Projection; 3]) -> Option<Point3<f64>> {
        let mut a = Matrix3::zeros();
        let mut b = Vector3::zeros();
        for p in projections {
            a += p.weight;
            b += p.weight * p.point.coords;
        }
        a.lu().solve(&b).map(Point3::from)
    }

    fn fit(&self, tracks: &[TrackParCov; 3]) -> Option<(Point3<f64>, [f64; 3])> {
        let helices = [
            Helix::new(&tracks[0].param, self.bz_kg),
            Helix::new(&tracks[1].param, self.bz_kg),
            Helix::new(&tracks[2].param, self.bz_kg),
        ];

        let mut vertex = Self::seed(tracks)?;
        let seed_projections = self.project_all(&helices, tracks, &vertex)?;
        let (zmin, zmax) = seed_projections
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.point.z), hi.max(p.point.z))
            });
        if zmax - zmin > self.config.max_dz_ini {
            return None;
        }

        let mut projections = seed_projections;
        let mut chi2_prev = Self::chi2_of(&projections, &vertex).iter().sum::<f64>();
        for _ in 0..self.config.max_iterations {
            let next = Self::solve(&projections)?;
            let next_projections = self.project_all(&helices, tracks, &next)?;
            let chi2 = Self::chi2_of(&next_projections, &next).iter().sum::<f64>();
            if !chi2.is_finite() {
                return None;
            }
            // A step that raises the chi-square is not taken.
            if chi2 > chi2_prev {
                break;
            }
            let moved = (next - vertex).norm();
            vertex = next;
            projections = next_projections;
            if moved < self.config.min_param_change
                || chi2 > self.config.min_rel_chi2_change * chi2_prev
            {
                break;
            }
            chi2_prev = chi2;
        }

        if !self.config.propagate_to_pca {
            // Residuals at the tracks' own reference points.
            let at_reference = [
                Projection {
                    point: tracks[0].param.position(),
                    weight: projections[0].weight,
                },
                Projection {
                    point: tracks[1].param.position(),
                    weight: projections[1].weight,
                },
                Projection {
                    point: tracks[2].param.position(),
                    weight: projections[2].weight,
                },
            ];
            return Some((vertex, Self::chi2_of(&at_reference, &vertex)));
        }
        Some((vertex, Self::chi2_of(&projections, &vertex)))
    }
}

impl VertexFitEngine for DcaFitter {
    fn process(&mut self, tracks: &[TrackParCov; 3]) -> usize {
        self.n_candidates = 0;
        let Some((vertex, chi2)) = self.fit(tracks) else {
            return 0;
        };
        if !vertex.coords.iter().all(|v| v.is_finite()) {
            return 0;
        }
        if vertex.x.hypot(vertex.y) > self.config.max_r {
            return 0;
        }
        if chi2.iter().sum::<f64>() > self.config.max_chi2 {
            return 0;
        }
        self.vertex = vertex;
        self.chi2 = chi2;
        self.n_candidates = 1;
        1
    }

    fn pca_candidate(&self) -> Point3<f64> {
        self.vertex
    }

    fn chi2_at_pca_candidate(&self, track: usize) -> f64 {
        self.chi2.get(track).copied().unwrap_or(f64::NAN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TrackCovariance, TrackParam};
    use approx::assert_relative_eq;

    fn prong(vertex: Point3<f64>, momentum: Vector3<f64>, charge: i8) -> TrackParCov {
        TrackParCov {
            param: TrackParam::from_momentum(vertex, momentum, charge),
            cov: TrackCovariance::from_diagonal([1e-6, 1e-6, 1e-4, 1e-4, 1e-4]),
        }
    }

    fn three_prongs(vertex: Point3<f64>) -> [TrackParCov; 3] {
        [
            prong(vertex, Vector3::new(1.2, 0.3, 0.4), 1),
            prong(vertex, Vector3::new(0.2, 0.9, -0.3), -1),
            prong(vertex, Vector3::new(-0.4, 0.5, 0.1), 1),
        ]
    }

    #[test]
    fn tracks_from_a_common_point_fit_that_point() {
        let v = Point3::new(0.03, -0.02, 0.1);
        let mut fitter = DcaFitter::new(FitterConfig::default(), 5.0);
        assert_eq!(fitter.process(&three_prongs(v)), 1);
        let fitted = fitter.pca_candidate();
        assert_relative_eq!((fitted - v).norm(), 0.0, epsilon = 1e-6);
        for i in 0..3 {
            assert!(fitter.chi2_at_pca_candidate(i) < 1e-10);
        }
    }

    /// Move each reference point `s` cm downstream along its own helix.
    fn downstream(mut tracks: [TrackParCov; 3], bz: f64, s: f64) -> [TrackParCov; 3] {
        for t in tracks.iter_mut() {
            let h = Helix::new(&t.param, bz);
            let p = h.position_at(s);
            let dir = h.tangent_at(s);
            t.param.x = p.x;
            t.param.y = p.y;
            t.param.z = p.z;
            t.param.phi = dir.y.atan2(dir.x);
        }
        tracks
    }

    #[test]
    fn tracks_defined_away_from_the_vertex_are_pulled_back() {
        let v = Point3::new(0.02, 0.01, 0.0);
        let bz = 5.0;
        let tracks = downstream(three_prongs(v), bz, 2.0);
        let mut fitter = DcaFitter::new(FitterConfig::default(), bz);
        assert_eq!(fitter.process(&tracks), 1);
        assert!((fitter.pca_candidate() - v).norm() < 1e-3);
    }

    #[test]
    fn fitted_chi2_never_exceeds_the_seed() {
        let bz = 5.0;
        for v in [Point3::new(0.02, 0.01, 0.0), Point3::new(-0.3, 0.4, 1.0)] {
            for s in [0.5, 2.0, 10.0] {
                let tracks = downstream(three_prongs(v), bz, s);
                for ratio in [0.0, 0.5, 0.9, 2.0] {
                    let cfg = FitterConfig {
                        min_rel_chi2_change: ratio,
                        max_r: 10.0,
                        ..FitterConfig::default()
                    };
                    let fitter = DcaFitter::new(cfg, bz);
                    let helices = [
                        Helix::new(&tracks[0].param, bz),
                        Helix::new(&tracks[1].param, bz),
                        Helix::new(&tracks[2].param, bz),
                    ];
                    let seed = DcaFitter::seed(&tracks).unwrap();
                    let at_seed = fitter.project_all(&helices, &tracks, &seed).unwrap();
                    let seed_chi2: f64 = DcaFitter::chi2_of(&at_seed, &seed).iter().sum();

                    let (_, chi2) = fitter.fit(&tracks).unwrap();
                    let fitted: f64 = chi2.iter().sum();
                    assert!(
                        fitted <= seed_chi2,
                        "v={v:?} s={s} ratio={ratio}: {fitted} > seed {seed_chi2}"
                    );
                }
            }
        }
    }

    #[test]
    fn radius_limit_rejects() {
        let v = Point3::new(2.0, 0.0, 0.0);
        let mut fitter = DcaFitter::new(FitterConfig::default(), 5.0);
        assert_eq!(fitter.process(&three_prongs(v)), 0);

        let wide = FitterConfig {
            max_r: 10.0,
            ..FitterConfig::default()
        };
        let mut fitter = DcaFitter::new(wide, 5.0);
        assert_eq!(fitter.process(&three_prongs(v)), 1);
    }

    #[test]
    fn parallel_tracks_have_no_vertex() {
        let dir = Vector3::new(1.0, 0.0, 0.0);
        let tracks = [
            prong(Point3::new(0.0, 0.0, 0.0), dir, 0),
            prong(Point3::new(0.0, 0.1, 0.0), dir, 0),
            prong(Point3::new(0.0, 0.2, 0.0), dir, 0),
        ];
        let mut fitter = DcaFitter::new(FitterConfig::default(), 0.0);
        assert_eq!(fitter.process(&tracks), 0);
    }

    #[test]
    fn dz_limit_rejects_separated_tracks() {
        let v = Point3::new(0.0, 0.0, 0.0);
        let mut tracks = three_prongs(v);
        tracks[2].param.z += 5.0;
        let cfg = FitterConfig {
            max_dz_ini: 1.0,
            ..FitterConfig::default()
        };
        let mut fitter = DcaFitter::new(cfg, 5.0);
        assert_eq!(fitter.process(&tracks), 0);
    }

    #[test]
    fn weighted_mode_uses_covariance() {
        let v = Point3::new(0.01, 0.01, 0.01);
        let cfg = FitterConfig {
            use_abs_dca: false,
            ..FitterConfig::default()
        };
        let mut fitter = DcaFitter::new(cfg, 5.0);
        assert_eq!(fitter.process(&three_prongs(v)), 1);
        assert_relative_eq!((fitter.pca_candidate() - v).norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn chi2_index_out_of_range_is_nan() {
        let fitter = DcaFitter::new(FitterConfig::default(), 5.0);
        assert!(fitter.chi2_at_pca_candidate(3).is_nan());
    }
}
