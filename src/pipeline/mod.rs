//! Spatial join pipeline.
//!
//! Enriches every line sample in three whole-dataset stages: region containment,
//! nearest populated place, administrative area containment. Each stage is a left
//! join keyed by geometry: a sample with no match keeps empty fields for that stage
//! and is never dropped.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::models::{AdminArea, LineSample, Place, Region};
use crate::pip::{ContainmentPolicy, NearestIndex, PolygonIndex};

/// Nearest populated place for a sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceMatch {
    pub name: String,
    pub district: Option<String>,
    pub county_unitary: Option<String>,
    /// Planar distance truncated toward zero
    pub distance_m: i64,
}

/// Containing administrative area for a sample. Names the polygon lacks stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminMatch {
    pub country: Option<String>,
    pub admin_area: Option<String>,
}

/// A line sample with whatever the join stages have found so far
#[derive(Debug, Clone)]
pub struct EnrichedSample {
    pub sample: LineSample,
    pub region: Option<String>,
    pub place: Option<PlaceMatch>,
    pub admin: Option<AdminMatch>,
}

impl From<LineSample> for EnrichedSample {
    fn from(sample: LineSample) -> Self {
        Self {
            sample,
            region: None,
            place: None,
            admin: None,
        }
    }
}

/// Runs the join stages against a set of samples
#[derive(Debug, Clone)]
pub struct SpatialJoin {
    policy: ContainmentPolicy,
    show_progress: bool,
}

impl SpatialJoin {
    pub fn new(policy: ContainmentPolicy) -> Self {
        Self {
            policy,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// All three stages in order
    pub fn run(
        &self,
        samples: Vec<LineSample>,
        regions: Vec<Region>,
        places: Vec<Place>,
        admin_areas: Vec<AdminArea>,
    ) -> Vec<EnrichedSample> {
        let mut enriched: Vec<EnrichedSample> =
            samples.into_iter().map(EnrichedSample::from).collect();
        self.join_regions(&mut enriched, regions);
        self.join_places(&mut enriched, places);
        self.join_admin_areas(&mut enriched, admin_areas);
        enriched
    }

    /// Stage 1: region containing each sample
    fn join_regions(&self, enriched: &mut [EnrichedSample], regions: Vec<Region>) {
        info!("Region spatial join");
        let index = PolygonIndex::build(regions, self.policy);
        let pb = self.progress(enriched.len(), "regions");

        let mut matched = 0usize;
        for row in enriched.iter_mut() {
            let region = index.lookup(row.sample.location);
            matched += region.is_some() as usize;
            row.region = region.and_then(|r| r.name.clone());
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!(
            "{} of {} samples within a region",
            matched,
            enriched.len()
        );
    }

    /// Stage 2: nearest populated place and its truncated distance
    fn join_places(&self, enriched: &mut [EnrichedSample], places: Vec<Place>) {
        info!("Nearest populated place spatial join");
        let index = NearestIndex::build(places);
        let pb = self.progress(enriched.len(), "places");

        for row in enriched.iter_mut() {
            row.place = index.nearest(row.sample.location).map(|nearest| PlaceMatch {
                name: nearest.item.name.clone(),
                district: nearest.item.district.clone(),
                county_unitary: nearest.item.county_unitary.clone(),
                distance_m: nearest.distance as i64,
            });
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    /// Stage 3: administrative area containing each sample
    fn join_admin_areas(&self, enriched: &mut [EnrichedSample], admin_areas: Vec<AdminArea>) {
        info!("Administrative area spatial join");
        let index = PolygonIndex::build(admin_areas, self.policy);
        let pb = self.progress(enriched.len(), "admin areas");

        let mut matched = 0usize;
        for row in enriched.iter_mut() {
            row.admin = index.lookup(row.sample.location).map(|area| AdminMatch {
                country: area.country.clone(),
                admin_area: area.admin_area.clone(),
            });
            matched += row.admin.is_some() as usize;
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!(
            "{} of {} samples within an administrative area",
            matched,
            enriched.len()
        );
    }

    fn progress(&self, len: usize, stage: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.set_message(stage);
        pb
    }
}
