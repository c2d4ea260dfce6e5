// Per-client memoization of the read operations
use crate::models::{BlankApplication, Category, Job, JobSearchResult};
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub reset_count: usize,
}

/// The six cache slots of a client. Every slot is dropped together by
/// `reset`, which the client calls whenever the search location changes.
#[derive(Debug, Default)]
pub struct ResponseCache {
    categories: Option<Vec<Category>>,
    categories_by_code: Option<HashMap<String, String>>,
    jobs: Option<Vec<JobSearchResult>>,
    category_jobs: HashMap<String, Vec<JobSearchResult>>,
    jobs_by_id: HashMap<String, Job>,
    applications: HashMap<String, BlankApplication>,
    stats: CacheStats,
}

fn lookup<V: Clone>(stats: &mut CacheStats, value: Option<&V>) -> Option<V> {
    match value {
        Some(value) => {
            stats.hit_count += 1;
            Some(value.clone())
        }
        None => {
            stats.miss_count += 1;
            None
        }
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.categories = None;
        self.categories_by_code = None;
        self.jobs = None;
        self.category_jobs.clear();
        self.jobs_by_id.clear();
        self.applications.clear();
        self.stats.reset_count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_none()
            && self.categories_by_code.is_none()
            && self.jobs.is_none()
            && self.category_jobs.is_empty()
            && self.jobs_by_id.is_empty()
            && self.applications.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn categories(&mut self) -> Option<Vec<Category>> {
        lookup(&mut self.stats, self.categories.as_ref())
    }

    pub fn store_categories(&mut self, categories: Vec<Category>) {
        self.categories = Some(categories);
    }

    pub fn categories_by_code(&mut self) -> Option<HashMap<String, String>> {
        lookup(&mut self.stats, self.categories_by_code.as_ref())
    }

    pub fn store_categories_by_code(&mut self, categories: HashMap<String, String>) {
        self.categories_by_code = Some(categories);
    }

    pub fn jobs(&mut self) -> Option<Vec<JobSearchResult>> {
        lookup(&mut self.stats, self.jobs.as_ref())
    }

    pub fn store_jobs(&mut self, jobs: Vec<JobSearchResult>) {
        self.jobs = Some(jobs);
    }

    pub fn category_jobs(&mut self, code: &str) -> Option<Vec<JobSearchResult>> {
        lookup(&mut self.stats, self.category_jobs.get(code))
    }

    pub fn store_category_jobs(&mut self, code: String, jobs: Vec<JobSearchResult>) {
        self.category_jobs.insert(code, jobs);
    }

    pub fn job(&mut self, id: &str) -> Option<Job> {
        lookup(&mut self.stats, self.jobs_by_id.get(id))
    }

    pub fn store_job(&mut self, id: String, job: Job) {
        self.jobs_by_id.insert(id, job);
    }

    pub fn application(&mut self, job_id: &str) -> Option<BlankApplication> {
        lookup(&mut self.stats, self.applications.get(job_id))
    }

    pub fn store_application(&mut self, job_id: String, application: BlankApplication) {
        self.applications.insert(job_id, application);
    }
}
