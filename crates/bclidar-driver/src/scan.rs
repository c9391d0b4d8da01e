use bclidar_protocol::MeasurementNode;

use crate::error::{DriverError, Result};

/// Reorder a rotation into ascending angle order.
///
/// Nodes with zero distance carry no usable angle; they are given an
/// evenly spaced one before sorting. Leading invalid nodes step backwards
/// from the first valid node (clamped at 0°), trailing ones step forward
/// from the last valid node, and interior ones are placed relative to the
/// first node.
pub fn ascend_scan_data(nodes: &mut [MeasurementNode]) -> Result<()> {
    let Some(first_valid) = nodes.iter().position(MeasurementNode::is_valid) else {
        return Err(DriverError::OperationFailed(
            "scan contains no valid measurement".into(),
        ));
    };
    let count = nodes.len();
    let increment = 360.0 / count as f32;

    for i in (0..first_valid).rev() {
        let expected = (nodes[i + 1].angle_degrees() - increment).max(0.0);
        nodes[i].set_angle_degrees(expected);
    }

    let last_valid = nodes.iter().rposition(MeasurementNode::is_valid).unwrap_or(first_valid);
    for i in last_valid + 1..count {
        nodes[i].set_angle_degrees(wrap(nodes[i - 1].angle_degrees() + increment));
    }

    let front = nodes[0].angle_degrees();
    for (i, node) in nodes.iter_mut().enumerate().skip(1) {
        if !node.is_valid() {
            node.set_angle_degrees(wrap(front + i as f32 * increment));
        }
    }

    nodes.sort_by_key(|node| node.angle_z_q14);
    Ok(())
}

fn wrap(angle: f32) -> f32 {
    if angle > 360.0 {
        angle - 360.0
    } else {
        angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(angle: f32, dist_mm_q2: u32) -> MeasurementNode {
        let mut node = MeasurementNode {
            dist_mm_q2,
            ..Default::default()
        };
        node.set_angle_degrees(angle);
        node
    }

    #[test]
    fn all_invalid_fails() {
        let mut nodes = vec![node(10.0, 0), node(20.0, 0)];
        assert!(matches!(
            ascend_scan_data(&mut nodes),
            Err(DriverError::OperationFailed(_))
        ));
        assert!(matches!(
            ascend_scan_data(&mut []),
            Err(DriverError::OperationFailed(_))
        ));
    }

    #[test]
    fn sorts_valid_nodes() {
        let mut nodes = vec![node(270.0, 4), node(90.0, 8), node(180.0, 12), node(0.0, 16)];
        ascend_scan_data(&mut nodes).unwrap();
        let distances: Vec<u32> = nodes.iter().map(|n| n.dist_mm_q2).collect();
        assert_eq!(distances, vec![16, 8, 12, 4]);
    }

    #[test]
    fn head_nodes_step_back_from_first_valid() {
        // Four nodes: 90° per step.
        let mut nodes = vec![node(0.0, 0), node(200.0, 4), node(300.0, 4), node(0.0, 0)];
        ascend_scan_data(&mut nodes).unwrap();
        let angles: Vec<f32> = nodes.iter().map(|n| n.angle_degrees().round()).collect();
        // Head gets 110°; the trailing gap is then re-spaced from the front
        // node: 110 + 3 * 90 - 360 = 20°.
        assert_eq!(angles, vec![20.0, 110.0, 200.0, 300.0]);
    }

    #[test]
    fn head_clamps_at_zero() {
        let mut nodes = vec![node(0.0, 0), node(10.0, 4), node(20.0, 4), node(30.0, 4)];
        ascend_scan_data(&mut nodes).unwrap();
        assert_eq!(nodes[0].angle_z_q14, 0);
        assert_eq!(nodes[0].dist_mm_q2, 0);
    }

    #[test]
    fn interior_gaps_are_spaced_from_front() {
        let mut nodes = vec![node(0.0, 4), node(0.0, 0), node(180.0, 4), node(270.0, 4)];
        ascend_scan_data(&mut nodes).unwrap();
        assert_eq!(nodes[1].angle_degrees().round(), 90.0);
        assert_eq!(nodes[1].dist_mm_q2, 0);
    }
}
