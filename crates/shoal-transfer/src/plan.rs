/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Partition math: total size → jobs → parts.

use shoal_client::Error;

/// Most servers cap multipart uploads at 10,000 parts.
const MAX_PARTS: u64 = 10_000;

/// How a transfer is partitioned.
///
/// The plan forms a strict tree: plan → jobs → parts. Job `j` covers bytes
/// `[j · chunk_size · P, min((j+1) · chunk_size · P, total))` and owns part
/// numbers `[j·P, (j+1)·P)` (1-based on the wire); inside a job the slice is
/// subdivided into `P` sub-parts of size `⌈job_bytes / P⌉` with a smaller
/// tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    /// Object size in bytes.
    pub total_size: u64,
    /// Parallel jobs.
    pub jobs: u32,
    /// Parts per job.
    pub parts_per_job: u32,
    /// `⌈total_size / (jobs × parts_per_job)⌉`
    pub chunk_size: u64,
}

/// One part of one job: a global 1-based part number and the byte range it
/// covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSlice {
    /// Part number on the wire (1-based, ascending across jobs).
    pub part_number: u32,
    /// Byte offset into the object.
    pub offset: u64,
    /// Size in bytes; never zero.
    pub size: u64,
}

impl TransferPlan {
    /// Derives the plan for a transfer.
    pub fn new(total_size: u64, jobs: u32, parts_per_job: u32) -> Result<Self, Error> {
        if total_size == 0 {
            return Err(Error::Config("cannot transfer zero bytes".to_string()));
        }
        if jobs == 0 || parts_per_job == 0 {
            return Err(Error::Config(
                "jobs and parts per job must be at least one".to_string(),
            ));
        }
        let num_parts = jobs as u64 * parts_per_job as u64;
        if num_parts > MAX_PARTS {
            return Err(Error::Config(format!(
                "jobs × parts_per_job = {num_parts} exceeds the {MAX_PARTS}-part limit"
            )));
        }
        let chunk_size = total_size.div_ceil(num_parts);
        Ok(Self {
            total_size,
            jobs,
            parts_per_job,
            chunk_size,
        })
    }

    /// Bytes `[begin, end)` covered by `job`. Trailing jobs may be empty
    /// when the object is small.
    pub fn job_range(&self, job: u32) -> (u64, u64) {
        let per_job = self.chunk_size * self.parts_per_job as u64;
        let begin = (job as u64 * per_job).min(self.total_size);
        let end = ((job as u64 + 1) * per_job).min(self.total_size);
        (begin, end)
    }

    /// The parts of `job`, sequential and non-empty. Sub-parts are
    /// `⌈job_bytes / parts_per_job⌉` bytes with a smaller tail.
    pub fn parts_for_job(&self, job: u32) -> Vec<PartSlice> {
        let (begin, end) = self.job_range(job);
        let job_bytes = end - begin;
        if job_bytes == 0 {
            return Vec::new();
        }
        let part_size = job_bytes.div_ceil(self.parts_per_job as u64);
        let first_number = job * self.parts_per_job + 1;
        let mut parts = Vec::new();
        let mut offset = begin;
        for i in 0..self.parts_per_job {
            if offset >= end {
                break;
            }
            let size = part_size.min(end - offset);
            parts.push(PartSlice {
                part_number: first_number + i,
                offset,
                size,
            });
            offset += size;
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::TransferPlan;
    use pretty_assertions::assert_eq;

    #[test]
    fn chunk_size_is_ceiling_division() {
        let plan = TransferPlan::new(38_000_007, 3, 2).unwrap();
        assert_eq!(6_333_335, plan.chunk_size);

        let plan = TransferPlan::new(60, 3, 2).unwrap();
        assert_eq!(10, plan.chunk_size);
    }

    #[test]
    fn parts_cover_the_object_exactly_once() {
        for (total, jobs, parts_per_job) in [
            (38_000_007u64, 3u32, 2u32),
            (19_000_000, 3, 1),
            (1, 4, 4),
            (100, 7, 3),
            (10_000, 1, 1),
        ] {
            let plan = TransferPlan::new(total, jobs, parts_per_job).unwrap();
            let mut expected_offset = 0;
            let mut last_number = 0;
            for job in 0..jobs {
                for part in plan.parts_for_job(job) {
                    assert!(part.part_number > last_number, "part numbers ascend");
                    last_number = part.part_number;
                    assert_eq!(expected_offset, part.offset);
                    assert!(part.size > 0);
                    expected_offset += part.size;
                }
            }
            assert_eq!(total, expected_offset, "({total}, {jobs}, {parts_per_job})");
        }
    }

    #[test]
    fn job_ranges_are_contiguous() {
        let plan = TransferPlan::new(38_000_007, 3, 2).unwrap();
        assert_eq!((0, 12_666_670), plan.job_range(0));
        assert_eq!((12_666_670, 25_333_340), plan.job_range(1));
        assert_eq!((25_333_340, 38_000_007), plan.job_range(2));
    }

    #[test]
    fn small_objects_leave_trailing_jobs_empty() {
        let plan = TransferPlan::new(3, 4, 2).unwrap();
        // chunk size 1, two bytes per job: jobs 2 and 3 have nothing to do
        assert!(!plan.parts_for_job(0).is_empty());
        assert!(plan.parts_for_job(2).is_empty());
        assert!(plan.parts_for_job(3).is_empty());
        let total: u64 = (0..4)
            .flat_map(|j| plan.parts_for_job(j))
            .map(|p| p.size)
            .sum();
        assert_eq!(3, total);
    }

    #[test]
    fn plans_reject_degenerate_inputs() {
        assert!(TransferPlan::new(0, 1, 1).is_err());
        assert!(TransferPlan::new(10, 0, 1).is_err());
        assert!(TransferPlan::new(10, 1, 0).is_err());
        assert!(TransferPlan::new(10, 101, 100).is_err());
    }
}
