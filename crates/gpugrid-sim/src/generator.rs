use rand::prelude::*;
use rand::rngs::SmallRng;
use tracing::info;

use gpugrid_state::{
    ClusterSnapshot, DEFAULT_BLOCKS_PER_GPU, Gpu, GpuStatus, GpuType, Job, JobPriority, JobStatus,
    Node, NodeStatus, Segment, UsageTier, sort_jobs,
};

/// Nodes generated per GPU type, in generation order.
pub const NODE_COUNTS: [(GpuType, usize); 4] = [
    (GpuType::A100, 24),
    (GpuType::A30, 8),
    (GpuType::H100, 28),
    (GpuType::H200, 4),
];

pub const USERS: [&str; 10] = [
    "김철수", "이영희", "박민수", "정수진", "최영호", "한미영", "임동현", "송지은", "조현우", "윤서연",
];

pub const TEAMS: [&str; 8] = [
    "AI연구팀", "데이터팀", "비전팀", "NLP팀", "로보틱스팀", "추천팀", "검색팀", "음성팀",
];

const JOB_NAMES: [&str; 8] = [
    "ResNet Training",
    "BERT Fine-tuning",
    "Image Classification",
    "Object Detection",
    "Language Model",
    "Style Transfer",
    "Reinforcement Learning",
    "Neural Architecture Search",
];

const GPU_REQUESTS: [f64; 6] = [0.25, 0.5, 1.0, 2.0, 4.0, 8.0];
const CPU_REQUESTS: [u32; 6] = [1, 2, 4, 8, 16, 32];
const MEMORY_REQUESTS_GB: [u32; 6] = [4, 8, 16, 32, 64, 128];

/// Jobs are submitted up to a day before `now`.
const SUBMIT_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Deterministic snapshot generator.
pub struct ClusterGenerator {
    rng: SmallRng,
}

impl ClusterGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Nodes and jobs in one snapshot.
    pub fn generate_snapshot(&mut self, now: u64) -> ClusterSnapshot {
        let nodes = self.generate_nodes();
        let jobs = self.generate_jobs(&nodes, now);
        ClusterSnapshot::new(nodes, jobs)
    }

    pub fn generate_nodes(&mut self) -> Vec<Node> {
        let mut nodes = Vec::new();
        for (gpu_type, count) in NODE_COUNTS {
            for i in 1..=count {
                nodes.push(self.generate_node(gpu_type, i));
            }
        }

        let gpus: usize = nodes.iter().map(|n| n.gpus.len()).sum();
        let active: usize = nodes.iter().map(|n| n.count_gpus(GpuStatus::Active)).sum();
        info!(nodes = nodes.len(), gpus, active, "generated cluster nodes");
        nodes
    }

    /// One running job per tenant segment plus 3..=10 pending jobs per GPU
    /// type, in queue order.
    pub fn generate_jobs(&mut self, nodes: &[Node], now: u64) -> Vec<Job> {
        let mut jobs = Vec::new();

        for node in nodes {
            for gpu in &node.gpus {
                for (k, segment) in gpu.segments.iter().enumerate() {
                    let mut job = self.generate_job(
                        format!("running-{}-{k}", gpu.id),
                        &segment.user,
                        &segment.team,
                        node.gpu_type,
                        now,
                    );
                    job.gpu_request = f64::from(segment.usage.percent()) / 100.0;
                    job.status = JobStatus::Running;
                    jobs.push(job);
                }
            }
        }
        let running = jobs.len();

        for gpu_type in GpuType::ALL {
            let pending = self.rng.gen_range(3..=10);
            for i in 1..=pending {
                let user = self.pick(&USERS);
                let team = self.pick(&TEAMS);
                let job = self.generate_job(format!("{gpu_type}-pending-{i}"), user, team, gpu_type, now);
                jobs.push(job);
            }
        }

        sort_jobs(&mut jobs);
        info!(running, pending = jobs.len() - running, "generated job queue");
        jobs
    }

    fn generate_node(&mut self, gpu_type: GpuType, i: usize) -> Node {
        let gpu_count = if self.rng.gen_bool(0.7) { 8 } else { 4 };
        let gpus: Vec<Gpu> = (1..=gpu_count)
            .map(|j| self.generate_gpu(format!("{gpu_type}-{i}-{j}")))
            .collect();

        let avg_usage = Node::compute_avg_usage(&gpus, DEFAULT_BLOCKS_PER_GPU);
        let cpu = avg_usage * 60.0 + self.rng.gen_range(0.0..30.0);
        let memory = avg_usage * 50.0 + self.rng.gen_range(0.0..40.0);

        let status = if self.rng.gen_bool(0.95) {
            NodeStatus::Online
        } else if self.rng.gen_bool(0.5) {
            NodeStatus::Offline
        } else {
            NodeStatus::Maintenance
        };

        Node {
            id: format!("{gpu_type}-node-{i}"),
            name: format!("{gpu_type}-{i:02}"),
            gpu_type,
            gpus,
            status,
            avg_usage,
            cpu_usage: to_percent(cpu),
            memory_usage: to_percent(memory),
        }
    }

    fn generate_gpu(&mut self, id: String) -> Gpu {
        let roll: f64 = self.rng.gen_range(0.0..1.0);
        let status = if roll < 0.05 {
            GpuStatus::Error
        } else if roll < 0.1 {
            GpuStatus::Idle
        } else {
            GpuStatus::Active
        };

        if status != GpuStatus::Active {
            return Gpu {
                id,
                usage_blocks: 0,
                status,
                segments: Vec::new(),
                total_usage: UsageTier::Quarter,
            };
        }

        let total_usage = UsageTier::ALL[self.rng.gen_range(0..UsageTier::ALL.len())];
        Gpu {
            id,
            usage_blocks: total_usage.blocks(DEFAULT_BLOCKS_PER_GPU),
            status,
            segments: self.generate_segments(total_usage),
            total_usage,
        }
    }

    /// Split `total` among random tenants: 75 or 50 with even odds while
    /// they fit, otherwise 25.
    fn generate_segments(&mut self, total: UsageTier) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut remaining = total.percent();

        while remaining >= 25 {
            let usage = if remaining >= 75 && self.rng.gen_bool(0.5) {
                UsageTier::ThreeQuarters
            } else if remaining >= 50 && self.rng.gen_bool(0.5) {
                UsageTier::Half
            } else {
                UsageTier::Quarter
            };
            segments.push(Segment {
                user: self.pick(&USERS).to_string(),
                team: self.pick(&TEAMS).to_string(),
                usage,
            });
            remaining -= usage.percent();
        }
        segments
    }

    fn generate_job(&mut self, id: String, user: &str, team: &str, gpu_type: GpuType, now: u64) -> Job {
        let priority = if self.rng.gen_bool(0.4) {
            JobPriority::High
        } else if self.rng.gen_bool(0.7) {
            JobPriority::Normal
        } else {
            JobPriority::Low
        };

        Job {
            id,
            name: self.pick(&JOB_NAMES).to_string(),
            user: user.to_string(),
            team: team.to_string(),
            priority,
            gpu_type,
            gpu_request: self.pick(&GPU_REQUESTS),
            cpu_request: self.pick(&CPU_REQUESTS),
            memory_request_gb: self.pick(&MEMORY_REQUESTS_GB),
            submitted_at: now.saturating_sub(self.rng.gen_range(0..SUBMIT_WINDOW_SECS)),
            status: JobStatus::Pending,
        }
    }

    fn pick<T: Copy>(&mut self, options: &[T]) -> T {
        options[self.rng.gen_range(0..options.len())]
    }
}

fn to_percent(value: f64) -> u32 {
    value.round().clamp(0.0, 100.0) as u32
}
