//! Port claiming and bank trades.
//!
//! Trade ratios:
//! - 2:1 with the specialized port for the resource given
//! - 3:1 with any generic port
//! - 4:1 otherwise (bank default)
//!
//! Only the best available ratio applies; ports do not stack.

use crate::board::{Board, PortKind, Resource};
use crate::error::{CapacityError, SessionError, ValidationError};
use crate::events::{EventSink, ServerEvent};
use crate::hex::Vec3;
use crate::player::Player;
use tracing::{debug, info};

/// Ratio when the player owns no useful port
pub const BANK_RATIO: u32 = 4;

/// Outcome of a completed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeReceipt {
    pub give: Resource,
    pub give_amount: u32,
    pub receive: Resource,
    pub receive_amount: u32,
    pub ratio: u32,
}

/// Best ratio available to a player for giving away `resource`
pub fn best_trade_ratio(ports: &[PortKind], resource: Resource) -> u32 {
    ports
        .iter()
        .filter(|p| match p {
            PortKind::Generic => true,
            PortKind::Specialized(r) => *r == resource,
        })
        .map(PortKind::ratio)
        .min()
        .unwrap_or(BANK_RATIO)
}

/// Exchange `ratio * amount` of `give` for `amount` of `receive`.
///
/// All or nothing: if the received resource would overflow its stack the
/// payment is refunded and the ledger is left as it was.
pub fn execute_trade(
    player: &mut Player,
    give: Resource,
    receive: Resource,
    amount: u32,
    sink: &mut dyn EventSink,
) -> Result<TradeReceipt, SessionError> {
    if give == receive {
        return Err(ValidationError::SameResourceTrade.into());
    }
    if amount == 0 {
        return Err(ValidationError::InvalidAmount.into());
    }

    let ratio = best_trade_ratio(&player.ports, give);
    let cost = ratio.saturating_mul(amount);
    if player.ledger.get(give) < cost {
        return Err(ValidationError::Unaffordable.into());
    }

    player.ledger.remove_quiet(give, cost)?;
    let added = player.ledger.add_quiet(receive, amount);
    if added < amount {
        // Undo both sides before reporting
        player.ledger.remove_quiet(receive, added)?;
        player.ledger.add_quiet(give, cost);
        return Err(CapacityError::StackFull { resource: receive }.into());
    }

    player.ledger.notify(sink);
    sink.to_player(
        player.id,
        ServerEvent::TradeCompleted {
            give,
            give_amount: cost,
            receive,
            receive_amount: amount,
            ratio,
        },
    );
    info!(
        player = player.id,
        "Traded {} {} for {} {} at {}:1",
        cost,
        give,
        amount,
        receive,
        ratio
    );

    Ok(TradeReceipt {
        give,
        give_amount: cost,
        receive,
        receive_amount: amount,
        ratio,
    })
}

/// Grant every port anchored within `radius` of a new settlement.
///
/// Ports already owned are skipped. Returns the newly granted kinds.
pub fn claim_port(
    board: &Board,
    player: &mut Player,
    position: Vec3,
    radius: f64,
    harbor_master_threshold: usize,
    sink: &mut dyn EventSink,
) -> Vec<PortKind> {
    let mut granted = Vec::new();
    for port in board.ports_near(position, radius) {
        if player.owns_port(port.kind) {
            debug!(player = player.id, "Already owns {}", port.kind.name());
            continue;
        }
        player.ports.push(port.kind);
        granted.push(port.kind);
        sink.to_player(
            player.id,
            ServerEvent::PortClaimed {
                port: port.kind.name(),
            },
        );
        info!(player = player.id, "Claimed {}", port.kind.name());
    }

    if !granted.is_empty() {
        check_harbor_master(player, harbor_master_threshold, sink);
    }
    granted
}

/// Announce harbor-master points once a player holds enough distinct ports
pub fn check_harbor_master(player: &Player, threshold: usize, sink: &mut dyn EventSink) -> Option<usize> {
    let points = player.ports.len();
    if points < threshold {
        return None;
    }
    sink.to_player(player.id, ServerEvent::HarborMasterUpdate { points });
    Some(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::events::{NullSink, Outbound};
    use crate::player::PlayerKind;
    use crate::resources::Cost;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn player_with(cost: Cost) -> Player {
        Player::new(1, "Ana", PlayerKind::Human, 50, &cost)
    }

    #[test]
    fn test_best_ratio() {
        assert_eq!(best_trade_ratio(&[], Resource::Wood), 4);
        assert_eq!(best_trade_ratio(&[PortKind::Generic], Resource::Wood), 3);
        assert_eq!(
            best_trade_ratio(&[PortKind::Specialized(Resource::Wood)], Resource::Wood),
            2
        );
        assert_eq!(
            best_trade_ratio(&[PortKind::Specialized(Resource::Ore)], Resource::Wood),
            4
        );
        assert_eq!(
            best_trade_ratio(
                &[PortKind::Generic, PortKind::Specialized(Resource::Wood)],
                Resource::Wood
            ),
            2
        );
    }

    #[test]
    fn test_trade_with_wood_port() {
        let mut player = player_with(Cost::from([(Resource::Wood, 2)]));
        player.ports.push(PortKind::Specialized(Resource::Wood));
        let receipt = execute_trade(&mut player, Resource::Wood, Resource::Brick, 1, &mut NullSink).unwrap();
        assert_eq!(receipt.ratio, 2);
        assert_eq!(receipt.give_amount, 2);
        assert_eq!(player.ledger.get(Resource::Wood), 0);
        assert_eq!(player.ledger.get(Resource::Brick), 1);
    }

    #[test]
    fn test_bank_trade_needs_four() {
        let mut player = player_with(Cost::from([(Resource::Wood, 4)]));
        let receipt = execute_trade(&mut player, Resource::Wood, Resource::Brick, 1, &mut NullSink).unwrap();
        assert_eq!(receipt.ratio, 4);
        assert_eq!(player.ledger.get(Resource::Wood), 0);
        assert_eq!(player.ledger.get(Resource::Brick), 1);
    }

    #[test]
    fn test_insufficient_trade_changes_nothing() {
        let mut player = player_with(Cost::from([(Resource::Wood, 3)]));
        let before = player.ledger.clone();
        let mut sink: Vec<Outbound> = Vec::new();
        let err = execute_trade(&mut player, Resource::Wood, Resource::Brick, 1, &mut sink);
        assert_eq!(err, Err(SessionError::Validation(ValidationError::Unaffordable)));
        assert_eq!(player.ledger, before);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_same_kind_and_zero_amount() {
        let mut player = player_with(Cost::from([(Resource::Wood, 8)]));
        assert_eq!(
            execute_trade(&mut player, Resource::Wood, Resource::Wood, 1, &mut NullSink),
            Err(SessionError::Validation(ValidationError::SameResourceTrade))
        );
        assert_eq!(
            execute_trade(&mut player, Resource::Wood, Resource::Ore, 0, &mut NullSink),
            Err(SessionError::Validation(ValidationError::InvalidAmount))
        );
    }

    #[test]
    fn test_full_stack_rolls_back() {
        let mut player = player_with(Cost::from([(Resource::Wood, 8), (Resource::Brick, 49)]));
        let before = player.ledger.clone();
        let err = execute_trade(&mut player, Resource::Wood, Resource::Brick, 2, &mut NullSink);
        assert_eq!(
            err,
            Err(SessionError::Capacity(CapacityError::StackFull {
                resource: Resource::Brick
            }))
        );
        assert_eq!(player.ledger, before);
    }

    #[test]
    fn test_trade_events() {
        let mut player = player_with(Cost::from([(Resource::Ore, 4)]));
        let mut sink: Vec<Outbound> = Vec::new();
        execute_trade(&mut player, Resource::Ore, Resource::Wool, 1, &mut sink).unwrap();
        assert!(matches!(sink[0].event, ServerEvent::ResourceUpdate { .. }));
        assert_eq!(
            sink[1].event,
            ServerEvent::TradeCompleted {
                give: Resource::Ore,
                give_amount: 4,
                receive: Resource::Wool,
                receive_amount: 1,
                ratio: 4,
            }
        );
    }

    #[test]
    fn test_claim_port_at_anchor() {
        let board = Board::generate(&GameConfig::default(), &mut StdRng::seed_from_u64(6)).unwrap();
        let port = board.ports[0].clone();
        let mut player = player_with(Cost::new());

        let granted = claim_port(&board, &mut player, port.anchors[0], 5.0, 3, &mut NullSink);
        assert_eq!(granted, vec![port.kind]);
        assert!(player.owns_port(port.kind));

        // Claiming the same port again grants nothing
        let again = claim_port(&board, &mut player, port.anchors[1], 5.0, 3, &mut NullSink);
        assert!(again.is_empty());
        assert_eq!(player.ports.len(), 1);
    }

    #[test]
    fn test_no_port_far_from_coast() {
        let board = Board::generate(&GameConfig::default(), &mut StdRng::seed_from_u64(6)).unwrap();
        let mut player = player_with(Cost::new());
        let granted = claim_port(&board, &mut player, board.tiles[9].center, 5.0, 3, &mut NullSink);
        assert!(granted.is_empty());
    }

    #[test]
    fn test_harbor_master_threshold() {
        let mut player = player_with(Cost::new());
        player.ports = vec![PortKind::Generic, PortKind::Specialized(Resource::Wood)];
        assert_eq!(check_harbor_master(&player, 3, &mut NullSink), None);

        player.ports.push(PortKind::Specialized(Resource::Ore));
        let mut sink: Vec<Outbound> = Vec::new();
        assert_eq!(check_harbor_master(&player, 3, &mut sink), Some(3));
        assert_eq!(sink[0].event, ServerEvent::HarborMasterUpdate { points: 3 });
    }
}
