use super::TimeDelta;
use crate::ecs::types::*;
use crate::gesture::Squeeze;
use bevy_ecs::prelude::*;

/// Eases every entity's scale toward its squeeze target and queues the ones that collapsed.
pub fn sys_advance_squeeze(
    mut q: Query<(&RecordEntity, &mut Squeeze, &mut Transform3D)>,
    dt: Res<TimeDelta>,
    mut pops: ResMut<PopQueue>,
) {
    for (record, mut squeeze, mut transform) in &mut q {
        if squeeze.popped() {
            continue;
        }
        let mut scale = transform.scale;
        let collapsed = squeeze.advance(dt.0, &mut scale);
        if scale != transform.scale {
            transform.scale = scale;
        }
        if collapsed {
            pops.0.push(PopSignal { id: record.id });
        }
    }
}
