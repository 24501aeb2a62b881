use super::bind::BindPose;
use super::constraint::{ConstraintKind, ConstraintSpec, JointConstraint};
use super::events::{IkEvent, IkObserver};
use super::target::Target;
use crate::error::{IkError, IkResult};
use glam::Vec3;
use std::fmt;

/// A named run of bones solved towards one target.
///
/// `bones[0]` is the end effector and every following bone is the skeleton
/// parent of the one before it. `constraints[i]` limits the rotation of
/// `bones[i]`; slot `0` is always empty since the effector is never rotated.
#[derive(Debug)]
pub struct Chain {
    name: String,
    bones: Vec<usize>,
    constraints: Vec<Option<JointConstraint>>,
    target: Box<dyn Target>,
    enabled: bool,
}

impl Chain {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bones(&self) -> &[usize] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn effector(&self) -> usize {
        self.bones[0]
    }

    pub fn constraints(&self) -> &[Option<JointConstraint>] {
        &self.constraints
    }

    pub fn constraint(&self, index: usize) -> Option<&JointConstraint> {
        self.constraints.get(index).and_then(Option::as_ref)
    }

    pub fn target(&self) -> &dyn Target {
        self.target.as_ref()
    }

    pub fn target_position(&self) -> Vec3 {
        self.target.world_position()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Owns every chain of one solver and notifies observers of changes.
#[derive(Default)]
pub struct ChainRegistry {
    chains: Vec<Chain>,
    observers: Vec<Box<dyn IkObserver>>,
}

impl fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("chains", &self.chains)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl IkObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: IkEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }

    /// Registers a chain.
    ///
    /// `bones` runs effector first. `specs[i]` describes the constraint of
    /// `bones[i]`; missing entries mean no constraint and `specs[0]` is
    /// ignored. Nothing is registered if validation fails.
    pub fn create(
        &mut self,
        bind: &BindPose,
        name: impl Into<String>,
        bones: &[usize],
        specs: &[Option<ConstraintSpec>],
        target: impl Target + 'static,
    ) -> IkResult<()> {
        let name = name.into();
        if self.index_of(&name).is_some() {
            return Err(IkError::DuplicateChain(name));
        }
        validate_bones(bind, bones)?;

        let constraints = (0..bones.len())
            .map(|i| {
                if i == 0 {
                    return None;
                }
                specs
                    .get(i)
                    .copied()
                    .flatten()
                    .map(|spec| JointConstraint::new(bind.bone_dir(bones[i - 1]), &spec))
            })
            .collect();

        log::debug!("created chain '{name}' over {} bones", bones.len());
        self.chains.push(Chain {
            name: name.clone(),
            bones: bones.to_vec(),
            constraints,
            target: Box::new(target),
            enabled: true,
        });
        self.emit(IkEvent::ChainCreated { chain: name });
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> IkResult<()> {
        let index = self
            .index_of(name)
            .ok_or_else(|| IkError::UnknownChain(name.to_string()))?;
        self.chains.remove(index);
        log::debug!("removed chain '{name}'");
        self.emit(IkEvent::ChainDestroyed {
            chain: name.to_string(),
        });
        Ok(())
    }

    pub fn remove_all(&mut self) {
        let count = self.chains.len();
        self.chains.clear();
        log::debug!("removed all {count} chains");
        self.emit(IkEvent::ChainsCleared);
    }

    pub fn get(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name == name)
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chain_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.chains.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Sets, updates or clears (`spec == None`) the constraint at `index`.
    ///
    /// A spec of the same kind as the existing constraint updates it in
    /// place. Returns the kind now installed.
    pub fn set_constraint(
        &mut self,
        bind: &BindPose,
        name: &str,
        index: usize,
        spec: Option<ConstraintSpec>,
    ) -> IkResult<Option<ConstraintKind>> {
        let chain_index = self
            .index_of(name)
            .ok_or_else(|| IkError::UnknownChain(name.to_string()))?;
        let chain = &mut self.chains[chain_index];
        let len = chain.bones.len();
        if index == 0 || index >= len {
            return Err(IkError::ConstraintIndexOutOfRange { index, len });
        }

        let slot = &mut chain.constraints[index];
        let kind = match spec {
            None => {
                *slot = None;
                None
            }
            Some(spec) => {
                let updated = slot
                    .as_mut()
                    .is_some_and(|existing| existing.update(&spec));
                if !updated {
                    let bone_dir = bind.bone_dir(chain.bones[index - 1]);
                    *slot = Some(JointConstraint::new(bone_dir, &spec));
                    log::debug!("chain '{name}' joint {index}: new {:?} constraint", spec.kind);
                }
                Some(spec.kind)
            }
        };

        let bone = chain.bones[index];
        self.emit(IkEvent::ConstraintChanged {
            chain: name.to_string(),
            index,
            bone,
            kind,
        });
        Ok(kind)
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> IkResult<()> {
        self.get_mut(name)?.enabled = enabled;
        Ok(())
    }

    pub fn set_all_enabled(&mut self, enabled: bool) {
        for chain in &mut self.chains {
            chain.enabled = enabled;
        }
    }

    pub fn set_target(&mut self, name: &str, target: impl Target + 'static) -> IkResult<()> {
        self.get_mut(name)?.target = Box::new(target);
        Ok(())
    }

    fn get_mut(&mut self, name: &str) -> IkResult<&mut Chain> {
        self.chains
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| IkError::UnknownChain(name.to_string()))
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.chains.iter().position(|c| c.name == name)
    }
}

fn validate_bones(bind: &BindPose, bones: &[usize]) -> IkResult<()> {
    if bones.is_empty() {
        return Err(IkError::EmptyChain);
    }
    let bone_count = bind.len();
    for &bone in bones {
        if bone >= bone_count {
            return Err(IkError::BoneOutOfRange { bone, bone_count });
        }
    }
    for pair in bones.windows(2) {
        if bind.parent_of(pair[0]) != Some(pair[1]) {
            return Err(IkError::NotParent {
                child: pair[0],
                expected_parent: pair[1],
            });
        }
    }
    Ok(())
}
