//! Histogram registry: the in-memory [`CandidateSink`].
//!
//! One set of event histograms plus one [`CandidateHistograms`] per bucket
//! (category × cut state). Registries filled independently merge additively,
//! so a run can fill one per event or per worker and reduce afterwards.

use serde::{Deserialize, Serialize};

use super::histogram::{Axis, Histogram1D, HistogramError};
use super::{bucket_name, CandidateSink, Category, CutState, EventObservables};
use crate::components::CutVerdict;
use crate::engine::Candidate;

/// A per-candidate quantity booked in every bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observable {
    Cpa,
    InvMass,
    DecayRadius,
    DecayRadiusResoX,
    DecayRadiusResoY,
    DecayRadiusResoZ,
    DecayRadiusReso,
    Radius3Xy,
    DecayDca0,
    DecayDca1,
    DcaXy1,
    DcaXy2,
    DcaXy3,
    DcaXy1xDcaXy2,
    DcaXy3xDcaXy2,
    DcaZ1,
    DcaZ2,
    DcaZ3,
    DcaZ1xDcaZ2,
    DcaZ3xDcaZ2,
    Pt1,
    Pt2,
    Pt3,
    PtMom,
    PMom,
}

impl Observable {
    pub const ALL: [Observable; 25] = [
        Observable::Cpa,
        Observable::InvMass,
        Observable::DecayRadius,
        Observable::DecayRadiusResoX,
        Observable::DecayRadiusResoY,
        Observable::DecayRadiusResoZ,
        Observable::DecayRadiusReso,
        Observable::Radius3Xy,
        Observable::DecayDca0,
        Observable::DecayDca1,
        Observable::DcaXy1,
        Observable::DcaXy2,
        Observable::DcaXy3,
        Observable::DcaXy1xDcaXy2,
        Observable::DcaXy3xDcaXy2,
        Observable::DcaZ1,
        Observable::DcaZ2,
        Observable::DcaZ3,
        Observable::DcaZ1xDcaZ2,
        Observable::DcaZ3xDcaZ2,
        Observable::Pt1,
        Observable::Pt2,
        Observable::Pt3,
        Observable::PtMom,
        Observable::PMom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Observable::Cpa => "cpa",
            Observable::InvMass => "invmass",
            Observable::DecayRadius => "decayradius",
            Observable::DecayRadiusResoX => "decayradius_reso_x",
            Observable::DecayRadiusResoY => "decayradius_reso_y",
            Observable::DecayRadiusResoZ => "decayradius_reso_z",
            Observable::DecayRadiusReso => "decayradius_reso",
            Observable::Radius3Xy => "radius3xy",
            Observable::DecayDca0 => "decaydca0",
            Observable::DecayDca1 => "decaydca1",
            Observable::DcaXy1 => "dcaxy1",
            Observable::DcaXy2 => "dcaxy2",
            Observable::DcaXy3 => "dcaxy3",
            Observable::DcaXy1xDcaXy2 => "dcaxy1xdcaxy2",
            Observable::DcaXy3xDcaXy2 => "dcaxy3xdcaxy2",
            Observable::DcaZ1 => "dcaz1",
            Observable::DcaZ2 => "dcaz2",
            Observable::DcaZ3 => "dcaz3",
            Observable::DcaZ1xDcaZ2 => "dcaz1xdcaz2",
            Observable::DcaZ3xDcaZ2 => "dcaz3xdcaz2",
            Observable::Pt1 => "pt1",
            Observable::Pt2 => "pt2",
            Observable::Pt3 => "pt3",
            Observable::PtMom => "ptmom",
            Observable::PMom => "pmom",
        }
    }

    pub fn axis(self) -> Axis {
        use Observable::*;
        match self {
            Cpa => Axis::new(4000, -1.1, 1.1, "CPA"),
            InvMass => Axis::new(100, 2.5, 4.0, "invariant mass (GeV/c^2)"),
            DecayRadius => Axis::new(2000, 0.0, 0.1, "decay radius (cm)"),
            DecayRadiusResoX | DecayRadiusResoY | DecayRadiusResoZ | DecayRadiusReso => {
                Axis::new(2000, -0.01, 0.01, "decay radius resolution (cm)")
            }
            Radius3Xy => Axis::new(2000, 0.0, 0.01, "third-track production radius xy (cm)"),
            DecayDca0 | DecayDca1 => Axis::new(5000, -0.01, 0.01, "DCA to secondary (cm)"),
            DcaXy1 | DcaXy2 | DcaXy3 => Axis::new(5000, -0.05, 0.05, "DCA xy (cm)"),
            DcaZ1 | DcaZ2 | DcaZ3 => Axis::new(5000, -0.05, 0.05, "DCA z (cm)"),
            DcaXy1xDcaXy2 | DcaXy3xDcaXy2 => Axis::new(5000, -5e-6, 5e-6, "DCA xy product (cm^2)"),
            DcaZ1xDcaZ2 | DcaZ3xDcaZ2 => Axis::new(5000, -5e-6, 5e-6, "DCA z product (cm^2)"),
            Pt1 | Pt2 | Pt3 | PtMom | PMom => Axis::new(100, 0.0, 10.0, "p (GeV/c)"),
        }
    }

    /// Value for `candidate`, or `None` when the truth needed for it is absent.
    pub fn value(self, c: &Candidate) -> Option<f64> {
        use Observable::*;
        let products = c.dca_products();
        let v = match self {
            Cpa => c.cpa,
            InvMass => c.kinematics.mass,
            DecayRadius => c.decay_radius,
            DecayRadiusResoX => c.resolution()?.x,
            DecayRadiusResoY => c.resolution()?.y,
            DecayRadiusResoZ => c.resolution()?.z,
            DecayRadiusReso => c.resolution()?.norm(),
            Radius3Xy => c.radius3xy?,
            DecayDca0 => c.decay_dca()[0],
            DecayDca1 => c.decay_dca()[1],
            DcaXy1 => c.dca[0].xy,
            DcaXy2 => c.dca[1].xy,
            DcaXy3 => c.dca[2].xy,
            DcaXy1xDcaXy2 => products.xy12,
            DcaXy3xDcaXy2 => products.xy32,
            DcaZ1 => c.dca[0].z,
            DcaZ2 => c.dca[1].z,
            DcaZ3 => c.dca[2].z,
            DcaZ1xDcaZ2 => products.z12,
            DcaZ3xDcaZ2 => products.z32,
            Pt1 => c.pt[0],
            Pt2 => c.pt[1],
            Pt3 => c.pt[2],
            PtMom => c.kinematics.pt,
            PMom => c.kinematics.p,
        };
        Some(v)
    }
}

/// Every [`Observable`] for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredCandidateHistograms")]
pub struct CandidateHistograms {
    hists: Vec<Histogram1D>,
}

#[derive(Deserialize)]
struct StoredCandidateHistograms {
    hists: Vec<Histogram1D>,
}

impl TryFrom<StoredCandidateHistograms> for CandidateHistograms {
    type Error = HistogramError;

    fn try_from(stored: StoredCandidateHistograms) -> Result<Self, Self::Error> {
        if stored.hists.len() != Observable::ALL.len() {
            return Err(HistogramError::Shape {
                what: "candidate histograms",
                expected: Observable::ALL.len(),
                found: stored.hists.len(),
            });
        }
        for (obs, hist) in Observable::ALL.iter().zip(&stored.hists) {
            let expected = obs.axis();
            if !hist.axis().same_binning(&expected) {
                return Err(HistogramError::AxisMismatch {
                    left: expected.describe(),
                    right: hist.axis().describe(),
                });
            }
        }
        Ok(Self {
            hists: stored.hists,
        })
    }
}

impl Default for CandidateHistograms {
    fn default() -> Self {
        Self {
            hists: Observable::ALL
                .iter()
                .map(|o| Histogram1D::new(o.axis()))
                .collect(),
        }
    }
}

impl CandidateHistograms {
    pub fn fill(&mut self, candidate: &Candidate) {
        for (obs, hist) in Observable::ALL.iter().zip(self.hists.iter_mut()) {
            if let Some(v) = obs.value(candidate) {
                hist.fill(v);
            }
        }
    }

    pub fn get(&self, observable: Observable) -> &Histogram1D {
        &self.hists[observable as usize]
    }

    /// Candidates booked in this bucket.
    pub fn candidates(&self) -> u64 {
        self.get(Observable::InvMass).entries()
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, &Histogram1D)> {
        Observable::ALL
            .into_iter()
            .map(Observable::name)
            .zip(self.hists.iter())
    }

    pub fn merge(&mut self, other: &CandidateHistograms) -> Result<(), HistogramError> {
        if self.hists.len() != other.hists.len() {
            return Err(HistogramError::Shape {
                what: "candidate histograms",
                expected: self.hists.len(),
                found: other.hists.len(),
            });
        }
        for (a, b) in self.hists.iter_mut().zip(&other.hists) {
            a.merge(b)?;
        }
        Ok(())
    }
}

/// Event-level histograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHistograms {
    pub vtx_x: Histogram1D,
    pub vtx_y: Histogram1D,
    pub vtx_z: Histogram1D,
    pub mc_vtx_x: Histogram1D,
    pub mc_vtx_y: Histogram1D,
    pub mc_vtx_z: Histogram1D,
    /// Species counts, one unit bin per channel slot (1, 2, 3).
    pub particles: Histogram1D,
    pub multiplicity: Histogram1D,
    pub candidates_per_outer: Histogram1D,
}

impl Default for EventHistograms {
    fn default() -> Self {
        let vtx = |t: &str| Histogram1D::new(Axis::new(100, -0.1, 0.1, t));
        Self {
            vtx_x: vtx("vertex x (cm)"),
            vtx_y: vtx("vertex y (cm)"),
            vtx_z: vtx("vertex z (cm)"),
            mc_vtx_x: vtx("truth vertex x (cm)"),
            mc_vtx_y: vtx("truth vertex y (cm)"),
            mc_vtx_z: vtx("truth vertex z (cm)"),
            particles: Histogram1D::new(Axis::new(3, 0.5, 3.5, "channel slot")),
            multiplicity: Histogram1D::new(Axis::new(1000, 0.0, 10000.0, "tracks")),
            candidates_per_outer: Histogram1D::new(Axis::new(
                1000,
                0.0,
                10000.0,
                "candidates per outer track",
            )),
        }
    }
}

impl EventHistograms {
    pub fn named(&self) -> [(&'static str, &Histogram1D); 9] {
        [
            ("vtx_x", &self.vtx_x),
            ("vtx_y", &self.vtx_y),
            ("vtx_z", &self.vtx_z),
            ("mc_vtx_x", &self.mc_vtx_x),
            ("mc_vtx_y", &self.mc_vtx_y),
            ("mc_vtx_z", &self.mc_vtx_z),
            ("particles", &self.particles),
            ("multiplicity", &self.multiplicity),
            ("candidates_per_outer", &self.candidates_per_outer),
        ]
    }

    fn named_mut(&mut self) -> [&mut Histogram1D; 9] {
        [
            &mut self.vtx_x,
            &mut self.vtx_y,
            &mut self.vtx_z,
            &mut self.mc_vtx_x,
            &mut self.mc_vtx_y,
            &mut self.mc_vtx_z,
            &mut self.particles,
            &mut self.multiplicity,
            &mut self.candidates_per_outer,
        ]
    }

    pub fn merge(&mut self, other: &EventHistograms) -> Result<(), HistogramError> {
        for (a, (_, b)) in self.named_mut().into_iter().zip(other.named()) {
            a.merge(b)?;
        }
        Ok(())
    }
}

/// Clause-level rejection counts, per category, over every booked candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutFlow {
    pub total: [u64; 2],
    pub passing: [u64; 2],
    /// `rejected[category][clause]`, clauses in [`CutVerdict::CLAUSES`] order.
    pub rejected: [[u64; 7]; 2],
}

impl CutFlow {
    fn record(&mut self, category: Category, verdict: &CutVerdict) {
        let c = category as usize;
        self.total[c] += 1;
        if !verdict.is_cut() {
            self.passing[c] += 1;
        }
        for (slot, flag) in self.rejected[c].iter_mut().zip(verdict.flags()) {
            if flag {
                *slot += 1;
            }
        }
    }

    fn merge(&mut self, other: &CutFlow) {
        for c in 0..2 {
            self.total[c] += other.total[c];
            self.passing[c] += other.passing[c];
            for (a, b) in self.rejected[c].iter_mut().zip(other.rejected[c]) {
                *a += b;
            }
        }
    }
}

/// All histograms of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredRegistry")]
pub struct HistogramRegistry {
    pub event: EventHistograms,
    /// Indexed by [`HistogramRegistry::bucket_index`].
    buckets: Vec<CandidateHistograms>,
    pub cut_flow: CutFlow,
}

#[derive(Deserialize)]
struct StoredRegistry {
    event: EventHistograms,
    buckets: Vec<CandidateHistograms>,
    cut_flow: CutFlow,
}

impl TryFrom<StoredRegistry> for HistogramRegistry {
    type Error = HistogramError;

    fn try_from(stored: StoredRegistry) -> Result<Self, Self::Error> {
        let expected = Category::ALL.len() * CutState::ALL.len();
        if stored.buckets.len() != expected {
            return Err(HistogramError::Shape {
                what: "candidate buckets",
                expected,
                found: stored.buckets.len(),
            });
        }
        Ok(Self {
            event: stored.event,
            buckets: stored.buckets,
            cut_flow: stored.cut_flow,
        })
    }
}

impl Default for HistogramRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HistogramRegistry {
    pub fn new() -> Self {
        Self {
            event: EventHistograms::default(),
            buckets: vec![CandidateHistograms::default(); Category::ALL.len() * CutState::ALL.len()],
            cut_flow: CutFlow::default(),
        }
    }

    fn bucket_index(category: Category, state: CutState) -> usize {
        category as usize * CutState::ALL.len() + state as usize
    }

    pub fn bucket(&self, category: Category, state: CutState) -> &CandidateHistograms {
        &self.buckets[Self::bucket_index(category, state)]
    }

    /// Every bucket with its name, e.g. `("signocut", ..)`.
    pub fn buckets(&self) -> impl Iterator<Item = (String, &CandidateHistograms)> {
        Category::ALL.iter().flat_map(move |&cat| {
            CutState::ALL
                .iter()
                .map(move |&state| (bucket_name(cat, state), self.bucket(cat, state)))
        })
    }

    pub fn merge(&mut self, other: &HistogramRegistry) -> Result<(), HistogramError> {
        if self.buckets.len() != other.buckets.len() {
            return Err(HistogramError::Shape {
                what: "candidate buckets",
                expected: self.buckets.len(),
                found: other.buckets.len(),
            });
        }
        self.event.merge(&other.event)?;
        for (a, b) in self.buckets.iter_mut().zip(&other.buckets) {
            a.merge(b)?;
        }
        self.cut_flow.merge(&other.cut_flow);
        Ok(())
    }
}

impl CandidateSink for HistogramRegistry {
    fn fill_event(&mut self, event: &EventObservables) {
        self.event.vtx_x.fill(event.vertex.x);
        self.event.vtx_y.fill(event.vertex.y);
        self.event.vtx_z.fill(event.vertex.z);
        if let Some(mc) = event.truth_vertex {
            self.event.mc_vtx_x.fill(mc.x);
            self.event.mc_vtx_y.fill(mc.y);
            self.event.mc_vtx_z.fill(mc.z);
        }
        for (slot, &count) in event.species_counts.iter().enumerate() {
            self.event
                .particles
                .fill_weighted(slot as f64 + 1.0, count as f64);
        }
        self.event.multiplicity.fill(event.multiplicity as f64);
    }

    fn fill_candidate(&mut self, category: Category, state: CutState, candidate: &Candidate) {
        if state == CutState::NoCut {
            self.cut_flow.record(category, &candidate.verdict);
        }
        self.buckets[Self::bucket_index(category, state)].fill(candidate);
    }

    fn fill_candidates_per_outer(&mut self, count: usize) {
        self.event.candidates_per_outer.fill(count as f64);
    }
}
