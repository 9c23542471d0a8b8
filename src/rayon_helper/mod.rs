// Choose between sequential and rayon iteration depending on the `parallel` feature.

#[cfg(feature = "parallel")]
macro_rules! iter {
    ($e:expr) => {
        $e.par_iter()
    };
}

#[cfg(not(feature = "parallel"))]
macro_rules! iter {
    ($e:expr) => {
        $e.iter()
    };
}

#[cfg(feature = "parallel")]
macro_rules! iter_mut {
    ($e:expr) => {
        $e.par_iter_mut()
    };
}

#[cfg(not(feature = "parallel"))]
macro_rules! iter_mut {
    ($e:expr) => {
        $e.iter_mut()
    };
}

#[cfg(feature = "parallel")]
macro_rules! into_iter {
    ($e:expr) => {
        $e.into_par_iter()
    };
}

#[cfg(not(feature = "parallel"))]
macro_rules! into_iter {
    ($e:expr) => {
        $e.into_iter()
    };
}

pub(crate) use {into_iter, iter, iter_mut};
