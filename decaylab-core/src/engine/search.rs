//! Candidate search: combinatorial three-track enumeration for one event.
//!
//! Per event:
//! 1. Book event-level observables and bucket tracks by channel species.
//! 2. Optionally skip the search when the primary vertex has too few contributors.
//! 3. Propagate every bucketed track to the reference vertex once.
//! 4. Enumerate outer × middle × inner tracks with identity exclusion,
//!    fit, score and route each surviving triplet to the sink.
//!
//! Propagation, covariance and fit failures prune a single triplet (or
//! every triplet of a track) and are only counted in [`SearchStats`].

use log::{debug, warn};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::candidate::Candidate;
use super::stats::SearchStats;
use crate::components::{
    classify, combine, CutEvaluator, CutInput, CutThresholds, Dca, DcaFitter, FitError,
    FitterConfig, HelixPropagator, Hypothesis, TrackPropagator, VertexFitAdapter,
    VertexFitEngine,
};
use crate::constants::{
    MASS_DEUTERON, MASS_KAON, MASS_PION, PDG_DEUTERON, PDG_KAON_MINUS, PDG_PION_PLUS,
    TESLA_TO_KGAUSS,
};
use crate::domain::{Event, Track};
use crate::sink::{CandidateSink, CutState, EventObservables};

/// Species and mass hypothesis of each slot, outer loop first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayChannel {
    /// PDG codes matched against each track's truth particle.
    pub species: [i32; 3],
    /// Mass hypotheses in GeV/c^2.
    pub masses: [f64; 3],
}

impl Default for DecayChannel {
    fn default() -> Self {
        Self {
            species: [PDG_DEUTERON, PDG_KAON_MINUS, PDG_PION_PLUS],
            masses: [MASS_DEUTERON, MASS_KAON, MASS_PION],
        }
    }
}

/// Event-level gate and reference-vertex choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSelection {
    /// Events whose primary vertex has fewer contributors are not searched.
    /// 0 searches every event.
    pub min_vtx_contrib: u32,
    /// Propagate to the simulated collision point when the event carries one.
    pub use_truth_vertex: bool,
}

impl Default for EventSelection {
    fn default() -> Self {
        Self {
            min_vtx_contrib: 0,
            use_truth_vertex: true,
        }
    }
}

/// Run-level search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Solenoid field in tesla.
    pub bz_tesla: f64,
    /// Maximum path length, in cm, when propagating to the reference vertex.
    pub max_step: f64,
    pub channel: DecayChannel,
    pub selection: EventSelection,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bz_tesla: 0.5,
            max_step: 100.0,
            channel: DecayChannel::default(),
            selection: EventSelection::default(),
        }
    }
}

impl SearchConfig {
    pub fn bz_kg(&self) -> f64 {
        self.bz_tesla * TESLA_TO_KGAUSS
    }
}

/// Cosine of the angle between `momentum` and `flight`; 0 when either is null.
pub fn pointing_cosine(momentum: &Vector3<f64>, flight: &Vector3<f64>) -> f64 {
    let norm = momentum.norm() * flight.norm();
    if norm > 0.0 {
        momentum.dot(flight) / norm
    } else {
        0.0
    }
}

/// Book a candidate under `NoCut` and then under its selection state.
pub fn route(sink: &mut dyn CandidateSink, candidate: &Candidate) {
    let category = candidate.category();
    sink.fill_candidate(category, CutState::NoCut, candidate);
    sink.fill_candidate(category, candidate.cut_state(), candidate);
}

/// The combinatorial search over one event at a time.
#[derive(Debug, Clone)]
pub struct CandidateSearch<P: TrackPropagator = HelixPropagator, E: VertexFitEngine = DcaFitter> {
    config: SearchConfig,
    propagator: P,
    fitter: VertexFitAdapter<E>,
    cuts: CutEvaluator,
}

impl CandidateSearch {
    /// Search with the analytic helix propagator and the built-in fitter.
    pub fn new(config: SearchConfig, fitter: FitterConfig, cuts: CutThresholds) -> Self {
        let bz_kg = config.bz_kg();
        Self::with_parts(
            config,
            HelixPropagator,
            VertexFitAdapter::new(fitter, bz_kg),
            CutEvaluator::new(cuts),
        )
    }
}

impl<P: TrackPropagator, E: VertexFitEngine> CandidateSearch<P, E> {
    pub fn with_parts(
        config: SearchConfig,
        propagator: P,
        fitter: VertexFitAdapter<E>,
        cuts: CutEvaluator,
    ) -> Self {
        Self {
            config,
            propagator,
            fitter,
            cuts,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn cuts(&self) -> &CutEvaluator {
        &self.cuts
    }

    /// Point every track is propagated to.
    pub fn reference_vertex(&self, event: &Event) -> Point3<f64> {
        match event.truth_vertex {
            Some(mc) if self.config.selection.use_truth_vertex => mc,
            _ => event.vertex.position,
        }
    }

    /// Indices into `event.tracks` of each slot's species.
    fn bucket_by_species(&self, event: &Event) -> [Vec<usize>; 3] {
        let species = &self.config.channel.species;
        let mut buckets: [Vec<usize>; 3] = Default::default();
        for (i, track) in event.tracks.iter().enumerate() {
            let Some(pdg) = event.species_of(track) else {
                continue;
            };
            for (slot, &wanted) in species.iter().enumerate() {
                if pdg == wanted {
                    buckets[slot].push(i);
                }
            }
        }
        buckets
    }

    /// Search one event, booking into `sink`.
    pub fn process_event(&mut self, event: &Event, sink: &mut dyn CandidateSink) -> SearchStats {
        let mut stats = SearchStats {
            events: 1,
            ..SearchStats::default()
        };

        let buckets = self.bucket_by_species(event);
        let species_counts = [buckets[0].len(), buckets[1].len(), buckets[2].len()];
        for (slot, &n) in species_counts.iter().enumerate() {
            stats.species[slot] = n as u64;
        }
        sink.fill_event(&EventObservables {
            vertex: event.vertex.position,
            truth_vertex: event.truth_vertex,
            species_counts,
            multiplicity: event.tracks.len(),
        });

        if event.vertex.n_contributors < self.config.selection.min_vtx_contrib {
            debug!(
                "event {}: {} vertex contributors < {}, not searched",
                event.index, event.vertex.n_contributors, self.config.selection.min_vtx_contrib
            );
            stats.events_rejected = 1;
            return stats;
        }

        let reference = self.reference_vertex(event);
        let dca = self.propagate_all(event, &buckets, &reference, &mut stats);

        for &i in &buckets[0] {
            let Some(d0) = dca[i] else {
                continue;
            };
            let outer = &event.tracks[i];
            let mut per_outer = 0usize;

            for &j in &buckets[1] {
                let middle = &event.tracks[j];
                if middle.id == outer.id {
                    continue;
                }
                let Some(d1) = dca[j] else {
                    continue;
                };

                for &k in &buckets[2] {
                    let inner = &event.tracks[k];
                    if inner.id == outer.id || inner.id == middle.id {
                        continue;
                    }
                    let Some(d2) = dca[k] else {
                        continue;
                    };

                    stats.triplets += 1;
                    let tracks = [outer, middle, inner];
                    match self.build_candidate(event, &reference, tracks, [d0, d1, d2]) {
                        Ok(candidate) => {
                            per_outer += 1;
                            stats.candidates += 1;
                            stats.signal += u64::from(candidate.is_signal());
                            stats.passing += u64::from(!candidate.is_cut());
                            route(sink, &candidate);
                        }
                        Err(FitError::DegenerateCovariance { slot }) => {
                            stats.degenerate_covariance += 1;
                            warn!(
                                "event {}: {} has a degenerate covariance, triplet skipped",
                                event.index, tracks[slot].id
                            );
                        }
                        Err(err) => {
                            stats.fit_failures += 1;
                            debug!(
                                "event {}: ({}, {}, {}) skipped: {err}",
                                event.index,
                                outer.id,
                                middle.id,
                                inner.id
                            );
                        }
                    }
                }
            }

            sink.fill_candidates_per_outer(per_outer);
        }

        debug!(
            "event {}: {} triplets, {} candidates ({} signal, {} passing)",
            event.index, stats.triplets, stats.candidates, stats.signal, stats.passing
        );
        stats
    }

    /// DCA of every bucketed track, indexed like `event.tracks`. `None` = failed or unbucketed.
    fn propagate_all(
        &self,
        event: &Event,
        buckets: &[Vec<usize>; 3],
        reference: &Point3<f64>,
        stats: &mut SearchStats,
    ) -> Vec<Option<Dca>> {
        let mut dca = vec![None; event.tracks.len()];
        let mut visited = vec![false; event.tracks.len()];
        let bz_kg = self.config.bz_kg();

        for &i in buckets.iter().flatten() {
            if std::mem::replace(&mut visited[i], true) {
                continue;
            }
            let track = &event.tracks[i];
            match self.propagator.propagate_to_dca(
                track.param(),
                reference,
                bz_kg,
                self.config.max_step,
            ) {
                Ok(d) => dca[i] = Some(d),
                Err(err) => {
                    stats.propagation_failures += 1;
                    debug!("event {}: {} not propagated: {err}", event.index, track.id);
                }
            }
        }
        dca
    }

    fn build_candidate(
        &mut self,
        event: &Event,
        reference: &Point3<f64>,
        tracks: [&Track; 3],
        dca: [Dca; 3],
    ) -> Result<Candidate, FitError> {
        let classification = classify(event, tracks);
        let fit = self
            .fitter
            .fit([&tracks[0].par_cov, &tracks[1].par_cov, &tracks[2].par_cov])?;

        let masses = self.config.channel.masses;
        let kinematics = combine([0, 1, 2].map(|s| Hypothesis {
            pt: tracks[s].pt,
            eta: tracks[s].eta,
            phi: tracks[s].phi,
            mass: masses[s],
        }));

        let decay_radius = fit.vertex.coords.norm();
        let cpa = pointing_cosine(&kinematics.momentum, &(fit.vertex - *reference));
        let verdict = self.cuts.evaluate(&CutInput {
            dca,
            second_pt: tracks[1].pt,
            third_pt: tracks[2].pt,
            decay_radius,
            cpa,
            mom_pt: kinematics.pt,
        });

        Ok(Candidate {
            tracks: tracks.map(|t| t.id),
            pt: tracks.map(|t| t.pt),
            dca,
            fit,
            kinematics,
            decay_radius,
            cpa,
            classification,
            verdict,
            radius3xy: production_radius_xy(event, tracks[2]),
        })
    }
}

/// Transverse distance of a track's truth origin from the simulated collision.
fn production_radius_xy(event: &Event, track: &Track) -> Option<f64> {
    let collision = event.truth_vertex?;
    let origin = event.truth_of(track)?.production_vertex;
    Some((origin.x - collision.x).hypot(origin.y - collision.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pointing_cosine_of_parallel_and_null_vectors() {
        let p = Vector3::new(1.0, 1.0, 0.0);
        assert_relative_eq!(pointing_cosine(&p, &(p * 0.01)), 1.0, epsilon = 1e-12);
        assert_relative_eq!(pointing_cosine(&p, &(-p)), -1.0, epsilon = 1e-12);
        assert_eq!(pointing_cosine(&p, &Vector3::zeros()), 0.0);
        assert_eq!(pointing_cosine(&Vector3::zeros(), &p), 0.0);
    }

    #[test]
    fn default_config_is_reference_channel() {
        let cfg = SearchConfig::default();
        assert_eq!(cfg.channel.species, [1_000_010_020, -321, 211]);
        assert_relative_eq!(cfg.bz_kg(), 5.0);
        assert_eq!(cfg.selection.min_vtx_contrib, 0);
        assert!(cfg.selection.use_truth_vertex);
    }
}
