//! The decision variable space: one boolean per (unit, term, student).

/// Index of a boolean decision variable
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn new(index: usize) -> VarId {
        VarId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Dense, row-major layout of the assignment variables. Variable `(unit, term, student)` has the
/// flat index `(unit * num_terms + term) * num_students + student`, so every triple maps to exactly
/// one variable and back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VarSpace {
    num_units: usize,
    num_terms: usize,
    num_students: usize,
}

impl VarSpace {
    pub fn new(num_units: usize, num_terms: usize, num_students: usize) -> VarSpace {
        VarSpace {
            num_units,
            num_terms,
            num_students,
        }
    }

    /// Total number of variables
    pub fn len(&self) -> usize {
        self.num_units * self.num_terms * self.num_students
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension as (units, terms, students)
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.num_units, self.num_terms, self.num_students)
    }

    pub fn num_units(&self) -> usize {
        self.num_units
    }

    pub fn num_terms(&self) -> usize {
        self.num_terms
    }

    pub fn num_students(&self) -> usize {
        self.num_students
    }

    /// Variable assigning `student` to `unit` in `term`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn var(&self, unit: usize, term: usize, student: usize) -> VarId {
        assert!(
            unit < self.num_units && term < self.num_terms && student < self.num_students,
            "assignment variable ({}, {}, {}) out of bounds {:?}",
            unit,
            term,
            student,
            self.dim()
        );
        VarId((unit * self.num_terms + term) * self.num_students + student)
    }

    /// Inverse of [`VarSpace::var`]: the (unit, term, student) triple of `var`
    pub fn triple(&self, var: VarId) -> (usize, usize, usize) {
        let student = var.0 % self.num_students;
        let rest = var.0 / self.num_students;
        (rest / self.num_terms, rest % self.num_terms, student)
    }

    pub fn iter(&self) -> impl Iterator<Item = VarId> {
        (0..self.len()).map(VarId)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn bijective_indexing() {
        let space = VarSpace::new(3, 4, 5);
        assert_eq!(space.len(), 60);
        let mut seen = HashSet::new();
        for unit in 0..3 {
            for term in 0..4 {
                for student in 0..5 {
                    let var = space.var(unit, term, student);
                    assert!(var.index() < space.len());
                    assert!(seen.insert(var), "{:?} is aliased", var);
                    assert_eq!(space.triple(var), (unit, term, student));
                }
            }
        }
        assert_eq!(seen.len(), space.len());
        assert_eq!(space.iter().count(), 60);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds() {
        let space = VarSpace::new(2, 2, 2);
        space.var(0, 2, 0);
    }
}
