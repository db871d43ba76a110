//! Per-player colony: hired NPCs and the research queue.
//!
//! Both run as part of the per-player stage of a session tick:
//! - NPC upkeep is charged once per full minute of game time
//! - one technology can be under research at a time

use crate::board::Resource;
use crate::error::{SessionError, ValidationError};
use crate::events::{EventSink, ServerEvent};
use crate::hex::Vec3;
use crate::resources::{Cost, ResourceLedger};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Seconds of game time between upkeep charges
pub const UPKEEP_PERIOD: f64 = 60.0;

// ==================== NPCs ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NpcType {
    Worker,
    Guard,
}

impl NpcType {
    pub const ALL: [NpcType; 2] = [NpcType::Worker, NpcType::Guard];

    pub fn name(&self) -> &'static str {
        match self {
            NpcType::Worker => "Worker",
            NpcType::Guard => "Guard",
        }
    }

    pub fn hire_cost(&self) -> Cost {
        match self {
            NpcType::Worker => Cost::from([(Resource::Wheat, 2), (Resource::Ore, 1)]),
            NpcType::Guard => Cost::from([(Resource::Wheat, 3), (Resource::Ore, 2)]),
        }
    }

    /// Charged every upkeep period
    pub fn upkeep(&self) -> Cost {
        match self {
            NpcType::Worker => Cost::from([(Resource::Wheat, 1)]),
            NpcType::Guard => Cost::from([(Resource::Wheat, 2)]),
        }
    }
}

impl fmt::Display for NpcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NpcType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NpcType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ValidationError::InvalidNpcType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: u32,
    pub npc_type: NpcType,
    pub position: Vec3,
}

// ==================== Research ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tech {
    ImprovedTools,
    BrickMasonry,
    Agriculture,
    Military,
    AdvancedEngineering,
    Trading,
}

impl Tech {
    pub const ALL: [Tech; 6] = [
        Tech::ImprovedTools,
        Tech::BrickMasonry,
        Tech::Agriculture,
        Tech::Military,
        Tech::AdvancedEngineering,
        Tech::Trading,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tech::ImprovedTools => "ImprovedTools",
            Tech::BrickMasonry => "BrickMasonry",
            Tech::Agriculture => "Agriculture",
            Tech::Military => "Military",
            Tech::AdvancedEngineering => "AdvancedEngineering",
            Tech::Trading => "Trading",
        }
    }

    pub fn cost(&self) -> Cost {
        use Resource::*;
        match self {
            Tech::ImprovedTools => Cost::from([(Ore, 3), (Wheat, 2)]),
            Tech::BrickMasonry => Cost::from([(Brick, 4), (Ore, 2)]),
            Tech::Agriculture => Cost::from([(Wheat, 3), (Wood, 2)]),
            Tech::Military => Cost::from([(Ore, 4), (Wheat, 3)]),
            Tech::AdvancedEngineering => Cost::from([(Ore, 5), (Brick, 4)]),
            Tech::Trading => Cost::from([(Wool, 3), (Wheat, 2)]),
        }
    }

    /// Research time in seconds
    pub fn seconds(&self) -> f64 {
        match self {
            Tech::ImprovedTools => 60.0,
            Tech::BrickMasonry => 90.0,
            Tech::Agriculture => 75.0,
            Tech::Military => 120.0,
            Tech::AdvancedEngineering => 150.0,
            Tech::Trading => 90.0,
        }
    }

    pub fn prerequisites(&self) -> &'static [Tech] {
        match self {
            Tech::AdvancedEngineering => &[Tech::BrickMasonry, Tech::ImprovedTools],
            _ => &[],
        }
    }
}

impl fmt::Display for Tech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tech {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tech::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ValidationError::InvalidTech(s.to_string()))
    }
}

/// Research in progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveResearch {
    pub tech: Tech,
    pub elapsed: f64,
}

// ==================== Colony ====================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    npcs: Vec<Npc>,
    next_npc_id: u32,
    /// Game time since the last upkeep charge
    upkeep_clock: f64,
    researched: Vec<Tech>,
    current: Option<ActiveResearch>,
}

impl Colony {
    pub fn npcs(&self) -> &[Npc] {
        &self.npcs
    }

    pub fn researched(&self) -> &[Tech] {
        &self.researched
    }

    pub fn has_researched(&self, tech: Tech) -> bool {
        self.researched.contains(&tech)
    }

    pub fn current_research(&self) -> Option<&ActiveResearch> {
        self.current.as_ref()
    }

    /// Upkeep charged per period for every hired NPC
    pub fn upkeep_cost(&self) -> Cost {
        let mut total = Cost::new();
        for npc in &self.npcs {
            for (resource, amount) in npc.npc_type.upkeep() {
                *total.entry(resource).or_insert(0) += amount;
            }
        }
        total
    }

    /// Hire an NPC by type name, paying its cost from the ledger.
    pub fn hire(
        &mut self,
        ledger: &mut ResourceLedger,
        npc_type: &str,
        position: Vec3,
        sink: &mut dyn EventSink,
    ) -> Result<u32, SessionError> {
        let npc_type: NpcType = npc_type.parse()?;
        let cost = npc_type.hire_cost();
        if !ledger.has_resources(&cost) {
            return Err(ValidationError::Unaffordable.into());
        }
        ledger.spend(&cost, sink)?;

        self.next_npc_id += 1;
        let id = self.next_npc_id;
        self.npcs.push(Npc {
            id,
            npc_type,
            position,
        });

        sink.to_player(
            ledger.owner(),
            ServerEvent::NpcHired {
                npc_id: id,
                npc_type: npc_type.name().to_string(),
                position,
            },
        );
        info!(player = ledger.owner(), "Hired {} #{}", npc_type, id);
        Ok(id)
    }

    /// Start researching a technology by name.
    pub fn start_research(
        &mut self,
        ledger: &mut ResourceLedger,
        tech: &str,
        sink: &mut dyn EventSink,
    ) -> Result<Tech, SessionError> {
        let tech: Tech = tech.parse()?;
        if self.has_researched(tech) {
            return Err(ValidationError::AlreadyResearched(tech.name().to_string()).into());
        }
        if let Some(missing) = tech
            .prerequisites()
            .iter()
            .find(|p| !self.has_researched(**p))
        {
            return Err(ValidationError::MissingPrerequisite(missing.name().to_string()).into());
        }
        let cost = tech.cost();
        if !ledger.has_resources(&cost) {
            return Err(ValidationError::Unaffordable.into());
        }
        if let Some(active) = &self.current {
            return Err(ValidationError::ResearchBusy(active.tech.name().to_string()).into());
        }

        ledger.spend(&cost, sink)?;
        self.current = Some(ActiveResearch { tech, elapsed: 0.0 });
        sink.to_player(
            ledger.owner(),
            ServerEvent::ResearchStarted {
                tech: tech.name().to_string(),
                seconds: tech.seconds(),
            },
        );
        info!(player = ledger.owner(), "Started research on {}", tech);
        Ok(tech)
    }

    /// Advance upkeep and research by `dt` seconds.
    pub fn update(&mut self, ledger: &mut ResourceLedger, dt: f64, sink: &mut dyn EventSink) {
        self.charge_upkeep(ledger, dt, sink);
        self.advance_research(ledger, dt, sink);
    }

    fn charge_upkeep(&mut self, ledger: &mut ResourceLedger, dt: f64, sink: &mut dyn EventSink) {
        if self.npcs.is_empty() {
            self.upkeep_clock = 0.0;
            return;
        }
        self.upkeep_clock += dt;
        while self.upkeep_clock >= UPKEEP_PERIOD {
            self.upkeep_clock -= UPKEEP_PERIOD;
            let cost = self.upkeep_cost();
            if ledger.spend(&cost, sink).is_err() {
                warn!(
                    player = ledger.owner(),
                    npcs = self.npcs.len(),
                    "Cannot pay NPC upkeep"
                );
            }
        }
    }

    fn advance_research(&mut self, ledger: &ResourceLedger, dt: f64, sink: &mut dyn EventSink) {
        let Some(active) = self.current.as_mut() else {
            return;
        };
        active.elapsed += dt;
        if active.elapsed < active.tech.seconds() {
            return;
        }

        let tech = active.tech;
        self.current = None;
        self.researched.push(tech);
        sink.to_player(
            ledger.owner(),
            ServerEvent::ResearchCompleted {
                tech: tech.name().to_string(),
            },
        );
        info!(player = ledger.owner(), "Completed research on {}", tech);
    }
}
