use nichesignal_common::SourceKind;

/// Metrics from a discovery run.
#[derive(Debug, Default)]
pub struct DiscoveryStats {
    pub records_by_source: [u64; 4], // SourceKind::ALL order
    pub pain_points_extracted: u64,
    pub clusters_formed: u64,
    pub candidates_filtered: u64,
    pub keywords_validated: u64,
    pub opportunities_ranked: u64,
    pub branches_degraded: u64,
}

impl DiscoveryStats {
    pub fn source_index(kind: SourceKind) -> usize {
        SourceKind::ALL
            .iter()
            .position(|k| *k == kind)
            .expect("kind is in ALL")
    }

    pub fn total_records(&self) -> u64 {
        self.records_by_source.iter().sum()
    }
}

impl std::fmt::Display for DiscoveryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Discovery Run Complete ===")?;
        writeln!(f, "Raw records:        {}", self.total_records())?;
        for kind in SourceKind::ALL {
            writeln!(
                f,
                "  {:<12} {}",
                format!("{kind}:"),
                self.records_by_source[Self::source_index(kind)]
            )?;
        }
        writeln!(f, "Pain points:        {}", self.pain_points_extracted)?;
        writeln!(f, "Clusters:           {}", self.clusters_formed)?;
        writeln!(f, "Candidates:         {}", self.candidates_filtered)?;
        writeln!(f, "Keywords validated: {}", self.keywords_validated)?;
        writeln!(f, "Opportunities:      {}", self.opportunities_ranked)?;
        if self.branches_degraded > 0 {
            writeln!(f, "Degraded branches:  {}", self.branches_degraded)?;
        }
        Ok(())
    }
}
